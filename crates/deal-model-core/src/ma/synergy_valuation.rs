use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::error::DealModelError;
use crate::types::*;
use crate::DealModelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a scenario's revenue synergy is stated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SynergyAmount {
    /// Fraction of the base revenue synergy (1.0 = base).
    Multiplier(Multiple),
    /// Absolute annual revenue synergy.
    Absolute(Money),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSynergyScenario {
    pub name: String,
    pub synergy: SynergyAmount,
    pub probability: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSynergyInput {
    pub target_revenue: Money,
    /// EV/Revenue multiple the combined revenue is valued at.
    pub revenue_multiple: Multiple,
    pub transaction_value: Money,
    pub base_synergy_revenue: Money,
    pub scenarios: Vec<RevenueSynergyScenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSynergyRow {
    pub name: String,
    pub synergy_revenue: Money,
    /// Synergy over standalone revenue, as a decimal.
    pub revenue_increase_pct: Rate,
    pub new_valuation: Money,
    pub value_creation: Money,
    /// Value creation over transaction value, as a decimal.
    pub success_ratio: Rate,
    pub probability: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSynergyOutput {
    pub scenarios: Vec<RevenueSynergyRow>,
    /// Probability-weighted sum of each field. Weights are used as given.
    pub expected: RevenueSynergyRow,
    pub probability_total: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value created by revenue synergies when the combined revenue is priced at
/// a revenue multiple, compared against what was paid.
pub fn value_revenue_synergies(
    input: &RevenueSynergyInput,
) -> DealModelResult<ComputationOutput<RevenueSynergyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let mut rows = Vec::with_capacity(input.scenarios.len());
    for scenario in &input.scenarios {
        let synergy_revenue = match scenario.synergy {
            SynergyAmount::Multiplier(m) => input.base_synergy_revenue * m,
            SynergyAmount::Absolute(amount) => amount,
        };
        let new_valuation = (input.target_revenue + synergy_revenue) * input.revenue_multiple;
        let value_creation = new_valuation - input.transaction_value;

        rows.push(RevenueSynergyRow {
            name: scenario.name.clone(),
            synergy_revenue,
            revenue_increase_pct: synergy_revenue / input.target_revenue,
            new_valuation,
            value_creation,
            success_ratio: value_creation / input.transaction_value,
            probability: scenario.probability,
        });
    }

    let probability_total: Decimal = rows.iter().map(|r| r.probability).sum();
    if (probability_total - Decimal::ONE).abs() > dec!(0.001) {
        warnings.push(format!(
            "Scenario probabilities sum to {probability_total}, not 1; expected values are not renormalized"
        ));
    }

    let weighted = |f: fn(&RevenueSynergyRow) -> Decimal| -> Decimal {
        rows.iter().map(|r| r.probability * f(r)).sum()
    };
    let expected = RevenueSynergyRow {
        name: "Expected Value".into(),
        synergy_revenue: weighted(|r| r.synergy_revenue),
        revenue_increase_pct: weighted(|r| r.revenue_increase_pct),
        new_valuation: weighted(|r| r.new_valuation),
        value_creation: weighted(|r| r.value_creation),
        success_ratio: weighted(|r| r.success_ratio),
        probability: probability_total,
    };

    let output = RevenueSynergyOutput {
        scenarios: rows,
        expected,
        probability_total,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Revenue Synergy Value Creation (EV/Revenue)",
        &serde_json::json!({
            "target_revenue": input.target_revenue.to_string(),
            "revenue_multiple": input.revenue_multiple.to_string(),
            "transaction_value": input.transaction_value.to_string(),
            "base_synergy_revenue": input.base_synergy_revenue.to_string(),
            "num_scenarios": input.scenarios.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate_input(input: &RevenueSynergyInput) -> DealModelResult<()> {
    if input.target_revenue <= Decimal::ZERO {
        return Err(DealModelError::invalid(
            "target_revenue",
            "Target revenue must be positive",
        ));
    }
    if input.transaction_value <= Decimal::ZERO {
        return Err(DealModelError::invalid(
            "transaction_value",
            "Transaction value must be positive",
        ));
    }
    if input.revenue_multiple < Decimal::ZERO {
        return Err(DealModelError::invalid(
            "revenue_multiple",
            "Revenue multiple must be non-negative",
        ));
    }
    if input.scenarios.is_empty() {
        return Err(DealModelError::InsufficientData(
            "At least one synergy scenario required".into(),
        ));
    }

    let mut seen = BTreeSet::new();
    for s in &input.scenarios {
        if !seen.insert(s.name.as_str()) {
            return Err(DealModelError::invalid(
                format!("scenario:{}", s.name),
                "Duplicate scenario name",
            ));
        }
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(DealModelError::invalid(
                format!("scenario:{} probability", s.name),
                "Probability must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
