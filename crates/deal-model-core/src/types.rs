use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages (12.5 = 12.5%). Only IRR search results are reported this way.
pub type Percent = Decimal;

/// Multiples (e.g., 20x exit EBITDA)
pub type Multiple = Decimal;

/// Year counts
pub type Years = u32;

/// Identifier of an entity in the fact store (ticker or internal id).
pub type EntityId = String;

/// A figure that may have been derived by an estimation policy rather than
/// read from a reported statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimated<T> {
    pub value: T,
    /// `true` when `value` came from an estimation formula, not a filing.
    pub estimated: bool,
}

impl<T> Estimated<T> {
    pub fn reported(value: T) -> Self {
        Estimated {
            value,
            estimated: false,
        }
    }

    pub fn estimated(value: T) -> Self {
        Estimated {
            value,
            estimated: true,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Divide, returning `None` when the denominator is not strictly positive.
///
/// Used for ratios that are economically meaningless below zero (P/E on a
/// loss, leverage on negative EBITDA); those must surface as absent, never
/// as zero.
pub fn ratio_if_positive(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator > Decimal::ZERO {
        numerator.checked_div(denominator)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ratio_if_positive() {
        assert_eq!(ratio_if_positive(dec!(10), dec!(4)), Some(dec!(2.5)));
        assert_eq!(ratio_if_positive(dec!(10), Decimal::ZERO), None);
        assert_eq!(ratio_if_positive(dec!(10), dec!(-5)), None);
    }

    #[test]
    fn test_estimated_tags() {
        assert!(Estimated::estimated(dec!(1)).estimated);
        assert!(!Estimated::reported(dec!(1)).estimated);
    }
}
