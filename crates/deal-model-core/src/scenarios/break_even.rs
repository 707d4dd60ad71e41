use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealModelError;
use crate::ma::projection::{project, ProjectionInput};
use crate::time_value::{bisect_irr, IrrOutcome, IrrSearch};
use crate::types::*;
use crate::DealModelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The input varied while searching for the break-even point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum BreakEvenDimension {
    /// Scale `base_synergies` by a multiplier in `[low, high]`. IRR rises
    /// with the multiplier, so the search reports the lowest one that works.
    SynergyMultiplier {
        base_synergies: Money,
        low: Multiple,
        high: Multiple,
    },
    /// Vary the initial outlay in `[low, high]`. IRR falls as the price
    /// rises, so the search reports the highest price that still works.
    TransactionValue { low: Money, high: Money },
}

impl BreakEvenDimension {
    fn bounds(&self) -> (Decimal, Decimal) {
        match self {
            BreakEvenDimension::SynergyMultiplier { low, high, .. }
            | BreakEvenDimension::TransactionValue { low, high } => (*low, *high),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BreakEvenDimension::SynergyMultiplier { .. } => "synergy_multiplier",
            BreakEvenDimension::TransactionValue { .. } => "transaction_value",
        }
    }

    /// Whether a larger value of this dimension makes the target easier to reach.
    fn increasing(&self) -> bool {
        matches!(self, BreakEvenDimension::SynergyMultiplier { .. })
    }

    fn apply(&self, base: &ProjectionInput, value: Decimal) -> ProjectionInput {
        let mut p = base.clone();
        match self {
            BreakEvenDimension::SynergyMultiplier { base_synergies, .. } => {
                p.annual_synergies = *base_synergies * value;
            }
            BreakEvenDimension::TransactionValue { .. } => {
                p.initial_outlay = value;
            }
        }
        p
    }
}

fn default_tolerance() -> Decimal {
    dec!(0.000001)
}

fn default_max_iterations() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenInput {
    /// Every projection input not being varied.
    pub projection: ProjectionInput,
    /// IRR to reach, as a decimal (0.10 = 10%).
    pub target_irr: Rate,
    pub dimension: BreakEvenDimension,
    /// Stop once the bracket is narrower than this fraction of its starting width.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub irr_search: IrrSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEvenStatus {
    /// A threshold lies strictly inside the bracket.
    Found,
    /// The target is already reached at the easy end of the bracket.
    AlwaysReached,
    /// The target is not reached even at the favourable end.
    NeverReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenResult {
    pub dimension: String,
    pub status: BreakEvenStatus,
    /// Lowest multiplier or highest transaction value at which the target
    /// IRR is reached. `None` when it is never reached within the bracket.
    pub threshold: Option<Decimal>,
    /// IRR at `threshold`, as a percentage. `None` when it lies beyond the
    /// IRR search ceiling or there is no threshold.
    pub irr_at_threshold: Option<Percent>,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Bisect over one dimension for the point at which the projected stream's
/// IRR first reaches the target.
pub fn find_break_even(
    input: &BreakEvenInput,
) -> DealModelResult<ComputationOutput<BreakEvenResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.projection.validate()?;

    let result = search(
        &input.projection,
        &input.dimension,
        input.target_irr,
        input.tolerance,
        input.max_iterations,
        &input.irr_search,
    )?;

    match result.status {
        BreakEvenStatus::AlwaysReached => warnings.push(format!(
            "Target IRR is reached across the whole {} bracket; the threshold is the bracket edge",
            result.dimension
        )),
        BreakEvenStatus::NeverReached => warnings.push(format!(
            "Target IRR is not reached anywhere in the {} bracket",
            result.dimension
        )),
        BreakEvenStatus::Found => {}
    }

    let (low, high) = input.dimension.bounds();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Break-Even Bisection on Target IRR",
        &serde_json::json!({
            "target_irr": input.target_irr.to_string(),
            "dimension": input.dimension.name(),
            "low": low.to_string(),
            "high": high.to_string(),
            "tolerance": input.tolerance.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// The highest initial outlay in `[low, high]` at which `projection` still
/// reaches `target_irr`.
pub fn max_transaction_value(
    projection: &ProjectionInput,
    target_irr: Rate,
    low: Money,
    high: Money,
    search_settings: &IrrSearch,
) -> DealModelResult<BreakEvenResult> {
    search(
        projection,
        &BreakEvenDimension::TransactionValue { low, high },
        target_irr,
        default_tolerance(),
        default_max_iterations(),
        search_settings,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn search(
    projection: &ProjectionInput,
    dimension: &BreakEvenDimension,
    target_irr: Rate,
    tolerance: Decimal,
    max_iterations: u32,
    irr_search: &IrrSearch,
) -> DealModelResult<BreakEvenResult> {
    irr_search.validate()?;
    let (low, high) = dimension.bounds();
    if low >= high {
        return Err(DealModelError::invalid(
            "dimension.high",
            "Upper bound must exceed the lower bound",
        ));
    }
    if low < Decimal::ZERO {
        return Err(DealModelError::invalid(
            "dimension.low",
            format!("{} must be non-negative", dimension.name()),
        ));
    }
    if tolerance <= Decimal::ZERO {
        return Err(DealModelError::invalid("tolerance", "Tolerance must be positive"));
    }
    if max_iterations == 0 {
        return Err(DealModelError::invalid(
            "max_iterations",
            "At least one iteration is required",
        ));
    }

    let outcome_at = |value: Decimal| -> DealModelResult<IrrOutcome> {
        bisect_irr(&project(&dimension.apply(projection, value))?, irr_search)
    };

    // `easy` is the end of the bracket most favourable to the target.
    let (easy, hard) = if dimension.increasing() {
        (high, low)
    } else {
        (low, high)
    };

    let hard_outcome = outcome_at(hard)?;
    if hard_outcome.reaches(target_irr) {
        return Ok(BreakEvenResult {
            dimension: dimension.name().into(),
            status: BreakEvenStatus::AlwaysReached,
            threshold: Some(hard),
            irr_at_threshold: hard_outcome.irr(),
            iterations: 0,
        });
    }
    let easy_outcome = outcome_at(easy)?;
    if !easy_outcome.reaches(target_irr) {
        return Ok(BreakEvenResult {
            dimension: dimension.name().into(),
            status: BreakEvenStatus::NeverReached,
            threshold: None,
            irr_at_threshold: None,
            iterations: 0,
        });
    }

    // Invariant: `reaching` meets the target, `missing` does not.
    let mut reaching = easy;
    let mut reaching_outcome = easy_outcome;
    let mut missing = hard;
    let min_width = (high - low) * tolerance;
    let two = dec!(2);
    let mut iterations = 0;

    while (reaching - missing).abs() > min_width && iterations < max_iterations {
        iterations += 1;
        let mid = (reaching + missing) / two;
        let outcome = outcome_at(mid)?;
        tracing::debug!(
            dimension = dimension.name(),
            iteration = iterations,
            value = %mid,
            reached = outcome.reaches(target_irr),
            "break-even bisection step"
        );
        if outcome.reaches(target_irr) {
            reaching = mid;
            reaching_outcome = outcome;
        } else {
            missing = mid;
        }
    }

    Ok(BreakEvenResult {
        dimension: dimension.name().into(),
        status: BreakEvenStatus::Found,
        threshold: Some(reaching),
        irr_at_threshold: reaching_outcome.irr(),
        iterations,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
