use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use deal_model_core::time_value::{self, IrrOutcome, IrrSearch};
use deal_model_core::{with_metadata, Money, Percent};

/// Arguments for a standalone IRR solve
#[derive(Args)]
pub struct IrrArgs {
    /// Cash flows, initial outlay first (comma-separated, e.g. "-100,110")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Also report NPV at this rate (decimal)
    #[arg(long, allow_hyphen_values = true)]
    pub discount_rate: Option<Decimal>,

    /// Lower bound of the IRR search (decimal)
    #[arg(long, default_value = "-0.99", allow_hyphen_values = true)]
    pub low: Decimal,

    /// Upper bound of the IRR search (decimal)
    #[arg(long, default_value = "10.0")]
    pub high: Decimal,
}

#[derive(Serialize)]
struct IrrReport {
    irr: Option<Percent>,
    outcome: IrrOutcome,
    npv_at_discount_rate: Option<Money>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let search = IrrSearch {
        low: args.low,
        high: args.high,
        ..IrrSearch::default()
    };
    let outcome = time_value::bisect_irr(&args.cash_flows, &search)?;
    if outcome.irr().is_none() {
        warnings.push(format!("No IRR in [{}, {}]: {:?}", args.low, args.high, outcome));
    }
    let npv_at_discount_rate = match args.discount_rate {
        Some(rate) => Some(time_value::npv(rate, &args.cash_flows)?),
        None => None,
    };

    let report = IrrReport {
        irr: outcome.irr(),
        outcome,
        npv_at_discount_rate,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "IRR by Bisection",
        &serde_json::json!({
            "periods": args.cash_flows.len(),
            "low": args.low.to_string(),
            "high": args.high.to_string(),
        }),
        warnings,
        elapsed,
        report,
    );
    Ok(serde_json::to_value(result)?)
}
