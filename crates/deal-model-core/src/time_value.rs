use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealModelError;
use crate::types::{Money, Percent, Rate};
use crate::DealModelResult;

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> DealModelResult<Money> {
    if rate <= dec!(-1) {
        return Err(DealModelError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| out_of_range(t))?;
        }
        if discount.is_zero() {
            return Err(DealModelError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|term| result.checked_add(term))
            .ok_or_else(|| out_of_range(t))?;
    }

    Ok(result)
}

fn out_of_range(period: usize) -> DealModelError {
    DealModelError::invalid(
        "rate",
        format!("Discounted cash flow at period {period} exceeds the decimal range"),
    )
}

// ---------------------------------------------------------------------------
// IRR by bisection
// ---------------------------------------------------------------------------

/// Search domain and stopping rule for the IRR bisection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrSearch {
    /// Lowest rate searched (decimal). Must be greater than -1.
    pub low: Rate,
    /// Highest rate searched (decimal).
    pub high: Rate,
    /// Absolute NPV at which a midpoint is accepted as the root.
    pub tolerance: Decimal,
    pub max_iterations: u32,
}

impl Default for IrrSearch {
    fn default() -> Self {
        IrrSearch {
            low: dec!(-0.99),
            high: dec!(10.0),
            tolerance: dec!(0.000001),
            max_iterations: 100,
        }
    }
}

impl IrrSearch {
    pub fn validate(&self) -> DealModelResult<()> {
        if self.low <= dec!(-1) {
            return Err(DealModelError::InvalidInput {
                field: "low".into(),
                reason: "Lower search bound must be greater than -100%".into(),
            });
        }
        if self.low >= self.high {
            return Err(DealModelError::InvalidInput {
                field: "high".into(),
                reason: "Upper search bound must exceed the lower bound".into(),
            });
        }
        if self.tolerance <= Decimal::ZERO {
            return Err(DealModelError::InvalidInput {
                field: "tolerance".into(),
                reason: "Tolerance must be positive".into(),
            });
        }
        if self.max_iterations == 0 {
            return Err(DealModelError::InvalidInput {
                field: "max_iterations".into(),
                reason: "At least one iteration is required".into(),
            });
        }
        Ok(())
    }
}

/// How an IRR search ended.
///
/// The search assumes NPV decreases in the rate, which holds for a stream
/// with a single sign change (negative outlay, positive inflows). Streams
/// with several sign changes may have several roots or none; no attempt is
/// made to detect that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "irr")]
pub enum IrrOutcome {
    /// NPV at the midpoint fell within tolerance. Value is a percentage.
    Converged(Percent),
    /// Iterations ran out; value is the final bracket midpoint, as a percentage.
    BestEffort(Percent),
    /// NPV is still positive at the upper bound: the IRR exceeds the ceiling.
    AboveCeiling,
    /// NPV is already negative at the lower bound: the IRR is below the floor.
    /// A bisection that only checks the ceiling would instead report a
    /// best-effort value pinned near the floor.
    BelowFloor,
    /// Fewer than two cash flows; there is nothing to discount.
    Degenerate,
}

impl IrrOutcome {
    pub fn irr(&self) -> Option<Percent> {
        match self {
            IrrOutcome::Converged(r) | IrrOutcome::BestEffort(r) => Some(*r),
            _ => None,
        }
    }

    /// Whether the IRR reaches `target` (a decimal rate).
    ///
    /// An IRR beyond the search ceiling reaches every target in range.
    pub fn reaches(&self, target: Rate) -> bool {
        match self {
            IrrOutcome::Converged(r) | IrrOutcome::BestEffort(r) => *r / dec!(100) >= target,
            IrrOutcome::AboveCeiling => true,
            IrrOutcome::BelowFloor | IrrOutcome::Degenerate => false,
        }
    }
}

/// NPV that saturates instead of overflowing.
///
/// Trial rates near -100% blow discounted terms up past the decimal range;
/// such a term is replaced by the signed extreme, which still orders
/// correctly against zero. Trial rates far above zero shrink later terms
/// toward nothing, so once the discount factor overflows the remaining terms
/// are dropped.
fn npv_saturating(rate: Rate, cash_flows: &[Money]) -> Decimal {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                None => break,
            }
        }
        // A zero flow contributes nothing, however small the discount factor.
        if cf.is_zero() {
            continue;
        }
        let term = cf.checked_div(discount).unwrap_or(if cf.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        });
        total = total.saturating_add(term);
    }

    total
}

/// Run the bisection and report how it ended.
pub fn bisect_irr(cash_flows: &[Money], search: &IrrSearch) -> DealModelResult<IrrOutcome> {
    search.validate()?;

    if cash_flows.len() < 2 {
        tracing::debug!(len = cash_flows.len(), "IRR requested for a degenerate stream");
        return Ok(IrrOutcome::Degenerate);
    }

    if npv_saturating(search.high, cash_flows) > Decimal::ZERO {
        tracing::info!(high = %search.high, "IRR exceeds search ceiling; no root in range");
        return Ok(IrrOutcome::AboveCeiling);
    }
    if npv_saturating(search.low, cash_flows) < Decimal::ZERO {
        tracing::info!(low = %search.low, "IRR below search floor; no root in range");
        return Ok(IrrOutcome::BelowFloor);
    }

    let two = dec!(2);
    let hundred = dec!(100);
    let mut low = search.low;
    let mut high = search.high;

    for _ in 0..search.max_iterations {
        let mid = (low + high) / two;
        let npv_mid = npv_saturating(mid, cash_flows);

        if npv_mid.abs() < search.tolerance {
            return Ok(IrrOutcome::Converged(mid * hundred));
        }

        if npv_mid > Decimal::ZERO {
            low = mid;
        } else {
            high = mid;
        }
    }

    let mid = (low + high) / two;
    let width = high - low;
    tracing::debug!(
        iterations = search.max_iterations,
        bracket_width = %width,
        "IRR search exhausted iterations; returning bracket midpoint"
    );
    Ok(IrrOutcome::BestEffort(mid * hundred))
}

/// IRR of `cash_flows` as a percentage (10.0 = 10%), searched over
/// [-99%, 1000%].
///
/// `None` means the stream has no root in that range (or is too short),
/// not that the computation failed.
pub fn solve_irr(cash_flows: &[Money]) -> Option<Percent> {
    // The default search is always valid.
    bisect_irr(cash_flows, &IrrSearch::default())
        .ok()
        .and_then(|o| o.irr())
}

/// IRR with a caller-supplied search domain. Errors only on an invalid domain.
pub fn solve_irr_with(cash_flows: &[Money], search: &IrrSearch) -> DealModelResult<Option<Percent>> {
    Ok(bisect_irr(cash_flows, search)?.irr())
}
