use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::TransactionAssumptions;
use crate::error::DealModelError;
use crate::types::*;
use crate::DealModelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the projector needs. All rates are decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInput {
    /// Year-1 recurring cash flow before synergies.
    pub base_annual_cash_flow: Money,
    pub base_growth_rate: Rate,
    /// Pre-tax synergies realised in year 1.
    pub annual_synergies: Money,
    pub synergy_growth_rate: Rate,
    pub tax_rate: Rate,
    /// Standalone EBITDA the exit multiple is applied to.
    pub terminal_ebitda_base: Money,
    pub terminal_multiple: Multiple,
    pub holding_period_years: Years,
    /// Purchase outlay, as a positive amount. Enters the stream negated.
    pub initial_outlay: Money,
}

impl ProjectionInput {
    /// Projection inputs for a deal, taking rates, multiple and horizon from
    /// the transaction assumptions.
    pub fn from_assumptions(
        assumptions: &TransactionAssumptions,
        base_annual_cash_flow: Money,
        annual_synergies: Money,
        terminal_ebitda_base: Money,
        initial_outlay: Money,
    ) -> Self {
        ProjectionInput {
            base_annual_cash_flow,
            base_growth_rate: assumptions.base_growth_rate,
            annual_synergies,
            synergy_growth_rate: assumptions.synergy_growth_rate,
            tax_rate: assumptions.tax_rate,
            terminal_ebitda_base,
            terminal_multiple: assumptions.terminal_multiple,
            holding_period_years: assumptions.holding_period_years,
            initial_outlay,
        }
    }

    pub fn validate(&self) -> DealModelResult<()> {
        let one = Decimal::ONE;
        if self.holding_period_years == 0 {
            return Err(DealModelError::invalid(
                "holding_period_years",
                "Holding period must be at least one year",
            ));
        }
        if self.base_growth_rate <= -one {
            return Err(DealModelError::invalid(
                "base_growth_rate",
                "Growth rate must be greater than -100%",
            ));
        }
        if self.synergy_growth_rate <= -one {
            return Err(DealModelError::invalid(
                "synergy_growth_rate",
                "Growth rate must be greater than -100%",
            ));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > one {
            return Err(DealModelError::invalid(
                "tax_rate",
                "Tax rate must be between 0 and 1",
            ));
        }
        if self.terminal_multiple < Decimal::ZERO {
            return Err(DealModelError::invalid(
                "terminal_multiple",
                "Terminal multiple must be non-negative",
            ));
        }
        if self.initial_outlay < Decimal::ZERO {
            return Err(DealModelError::invalid(
                "initial_outlay",
                "Initial outlay must be non-negative",
            ));
        }
        Ok(())
    }
}

/// One projected year, broken down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub year: Years,
    pub base_cash_flow: Money,
    pub after_tax_synergies: Money,
    /// Non-zero only in the final year.
    pub terminal_value: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    /// Index 0 is the negated outlay; the terminal value is folded into the last entry.
    pub cash_flows: Vec<Money>,
    pub years: Vec<ProjectedYear>,
    pub terminal_value: Money,
    /// Sum of years 1..N including the terminal value, undiscounted.
    pub total_inflows: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the nominal cash-flow stream for a holding period.
///
/// Year k: base * (1+g_b)^(k-1) + synergies * (1-t) * (1+g_s)^(k-1).
/// Terminal value: (terminal EBITDA base + synergies * (1+g_s)^(N-1)) * multiple,
/// added to year N only. The result has `holding_period_years + 1` entries.
///
/// Fails with `InvalidInput` when compounding over the holding period leaves
/// the decimal range.
pub fn project(input: &ProjectionInput) -> DealModelResult<Vec<Money>> {
    let (years, _) = project_years(input)?;
    let mut stream = Vec::with_capacity(years.len() + 1);
    stream.push(-input.initial_outlay);
    stream.extend(years.iter().map(|y| y.total));
    Ok(stream)
}

/// The terminal value alone.
pub fn terminal_value(input: &ProjectionInput) -> DealModelResult<Money> {
    if input.holding_period_years == 0 {
        return Ok(Decimal::ZERO);
    }
    let synergy_growth = growth_factor(
        input.synergy_growth_rate,
        input.holding_period_years - 1,
        "synergy_growth_rate",
    )?;
    input
        .annual_synergies
        .checked_mul(synergy_growth)
        .and_then(|s| s.checked_add(input.terminal_ebitda_base))
        .and_then(|ebitda| ebitda.checked_mul(input.terminal_multiple))
        .ok_or_else(|| out_of_range("terminal_multiple"))
}

/// Validated projection with a per-year breakdown, wrapped in the result envelope.
pub fn project_cash_flows(
    input: &ProjectionInput,
) -> DealModelResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.validate()?;

    let (years, terminal) = project_years(input)?;
    let mut cash_flows = Vec::with_capacity(years.len() + 1);
    cash_flows.push(-input.initial_outlay);
    cash_flows.extend(years.iter().map(|y| y.total));

    if years.iter().any(|y| y.total < Decimal::ZERO) {
        warnings.push(
            "At least one projected year is negative; the stream has more than one sign change \
             and its IRR may not be unique"
                .into(),
        );
    }
    if input.initial_outlay.is_zero() {
        warnings.push("Initial outlay is zero; IRR is undefined for this stream".into());
    }

    let total_inflows = years
        .iter()
        .try_fold(Decimal::ZERO, |acc, y| acc.checked_add(y.total))
        .ok_or_else(|| out_of_range("holding_period_years"))?;

    let output = ProjectionOutput {
        total_inflows,
        cash_flows,
        years,
        terminal_value: terminal,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Levered Cash Flow Projection with Synergy Ramp and Exit Multiple",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn out_of_range(field: &str) -> DealModelError {
    DealModelError::invalid(
        field,
        "Projected amount exceeds the decimal range over the holding period",
    )
}

/// (1 + rate)^periods by repeated multiplication.
fn growth_factor(rate: Rate, periods: Years, field: &str) -> DealModelResult<Decimal> {
    let step = Decimal::ONE + rate;
    (0..periods).try_fold(Decimal::ONE, |acc, _| {
        acc.checked_mul(step).ok_or_else(|| out_of_range(field))
    })
}

fn project_years(input: &ProjectionInput) -> DealModelResult<(Vec<ProjectedYear>, Money)> {
    let n = input.holding_period_years;
    let after_tax_synergies = input
        .annual_synergies
        .checked_mul(Decimal::ONE - input.tax_rate)
        .ok_or_else(|| out_of_range("annual_synergies"))?;
    let base_step = Decimal::ONE + input.base_growth_rate;
    let synergy_step = Decimal::ONE + input.synergy_growth_rate;
    let terminal = terminal_value(input)?;

    let mut base_factor = Decimal::ONE;
    let mut synergy_factor = Decimal::ONE;
    let mut years = Vec::with_capacity(n as usize);

    for year in 1..=n {
        if year > 1 {
            base_factor = base_factor
                .checked_mul(base_step)
                .ok_or_else(|| out_of_range("base_growth_rate"))?;
            synergy_factor = synergy_factor
                .checked_mul(synergy_step)
                .ok_or_else(|| out_of_range("synergy_growth_rate"))?;
        }
        let base_cash_flow = input
            .base_annual_cash_flow
            .checked_mul(base_factor)
            .ok_or_else(|| out_of_range("base_growth_rate"))?;
        let synergies = after_tax_synergies
            .checked_mul(synergy_factor)
            .ok_or_else(|| out_of_range("synergy_growth_rate"))?;
        let terminal_value = if year == n { terminal } else { Decimal::ZERO };
        let total = base_cash_flow
            .checked_add(synergies)
            .and_then(|t| t.checked_add(terminal_value))
            .ok_or_else(|| out_of_range("holding_period_years"))?;
        years.push(ProjectedYear {
            year,
            base_cash_flow,
            after_tax_synergies: synergies,
            terminal_value,
            total,
        });
    }

    Ok((years, terminal))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
