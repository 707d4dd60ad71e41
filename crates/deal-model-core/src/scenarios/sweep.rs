use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::error::DealModelError;
use crate::ma::projection::{project, ProjectionInput};
use crate::scenarios::break_even::max_transaction_value;
use crate::time_value::{bisect_irr, npv, IrrOutcome, IrrSearch};
use crate::types::*;
use crate::DealModelResult;

/// Probability totals within this distance of 1 are not flagged.
const PROBABILITY_TOLERANCE: Decimal = dec!(0.001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named synergy case. `probability` is optional; unweighted scenarios are
/// still evaluated but never enter the expected IRR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyScenario {
    pub name: String,
    pub synergy_multiplier: Multiple,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<Rate>,
}

impl SynergyScenario {
    pub fn new(name: impl Into<String>, synergy_multiplier: Multiple, probability: Rate) -> Self {
        SynergyScenario {
            name: name.into(),
            synergy_multiplier,
            probability: Some(probability),
        }
    }

    /// Six cases from half to double the base synergies, weighted toward the
    /// base case. Probabilities sum to 1.
    pub fn standard_set() -> Vec<SynergyScenario> {
        vec![
            SynergyScenario::new("Very Pessimistic", dec!(0.50), dec!(0.10)),
            SynergyScenario::new("Pessimistic", dec!(0.75), dec!(0.20)),
            SynergyScenario::new("Base", dec!(1.00), dec!(0.35)),
            SynergyScenario::new("Optimistic", dec!(1.25), dec!(0.20)),
            SynergyScenario::new("Very Optimistic", dec!(1.50), dec!(0.10)),
            SynergyScenario::new("Bull", dec!(2.00), dec!(0.05)),
        ]
    }
}

/// Transaction-value range searched for each scenario's break-even price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValueBracket {
    pub low: Money,
    pub high: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    pub scenarios: Vec<SynergyScenario>,
    /// Annual synergies at a multiplier of 1.0.
    pub base_synergies: Money,
    /// Shared projection inputs. `annual_synergies` is replaced per scenario.
    pub projection: ProjectionInput,
    /// Fixed rate for the comparable NPV column (decimal).
    pub discount_rate: Rate,
    #[serde(default)]
    pub irr_search: IrrSearch,
    /// When set, each scenario also reports the highest transaction value
    /// that still reaches this IRR (decimal).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_irr: Option<Rate>,
    /// Defaults to 0.1x..5x the projection's initial outlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_value_bracket: Option<ValueBracket>,
}

impl SweepInput {
    fn value_bracket(&self) -> ValueBracket {
        self.transaction_value_bracket.unwrap_or(ValueBracket {
            low: self.projection.initial_outlay * dec!(0.1),
            high: self.projection.initial_outlay * dec!(5),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub synergy_multiplier: Multiple,
    pub annual_synergies: Money,
    pub probability: Option<Rate>,
    /// Percentage. `None` when the search found no root or the scenario failed.
    pub irr: Option<Percent>,
    /// How the IRR search ended; absent when the scenario failed.
    pub irr_outcome: Option<IrrOutcome>,
    pub npv_at_discount_rate: Option<Money>,
    pub cash_flows: Vec<Money>,
    pub break_even_transaction_value: Option<Money>,
    /// Why the scenario could not be evaluated.
    pub failure: Option<String>,
}

impl ScenarioResult {
    fn failed(scenario: &SynergyScenario, base_synergies: Money, reason: String) -> Self {
        ScenarioResult {
            scenario_name: scenario.name.clone(),
            synergy_multiplier: scenario.synergy_multiplier,
            annual_synergies: base_synergies * scenario.synergy_multiplier,
            probability: scenario.probability,
            irr: None,
            irr_outcome: None,
            npv_at_discount_rate: None,
            cash_flows: Vec::new(),
            break_even_transaction_value: None,
            failure: Some(reason),
        }
    }
}

/// Per-scenario results plus the probability-weighted expected IRR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub results: Vec<ScenarioResult>,
    /// `weighted_irr_sum / defined_probability_total`, as a percentage.
    /// `None` when no weighted scenario has a defined IRR.
    pub expected_irr: Option<Percent>,
    /// Sum of probability * IRR over weighted scenarios with a defined IRR.
    pub weighted_irr_sum: Percent,
    /// Sum of the probabilities behind `weighted_irr_sum`.
    pub defined_probability_total: Rate,
    /// Sum of every supplied probability, as given.
    pub probability_total: Rate,
    /// Scenarios left out of the expectation because their IRR is undefined.
    pub excluded_scenarios: Vec<String>,
}

impl ScenarioSet {
    /// Aggregate evaluated scenarios.
    ///
    /// A scenario without an IRR adds nothing to either side of the
    /// weighting; it is not read as 0%. Weights are never renormalized to 1.
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let mut weighted_irr_sum = Decimal::ZERO;
        let mut defined_probability_total = Decimal::ZERO;
        let mut probability_total = Decimal::ZERO;
        let mut excluded_scenarios = Vec::new();

        for r in &results {
            if let Some(p) = r.probability {
                probability_total += p;
            }
            match (r.irr, r.probability) {
                (Some(irr), Some(p)) => {
                    weighted_irr_sum += p * irr;
                    defined_probability_total += p;
                }
                (None, _) => excluded_scenarios.push(r.scenario_name.clone()),
                (Some(_), None) => {}
            }
        }

        let expected_irr = if defined_probability_total > Decimal::ZERO {
            Some(weighted_irr_sum / defined_probability_total)
        } else {
            None
        };

        ScenarioSet {
            results,
            expected_irr,
            weighted_irr_sum,
            defined_probability_total,
            probability_total,
            excluded_scenarios,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project and solve every scenario, then aggregate.
///
/// Scenarios are independent: one that fails is reported with `failure` set
/// and does not stop its siblings.
pub fn sweep(input: &SweepInput) -> DealModelResult<ComputationOutput<ScenarioSet>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let mut results = Vec::with_capacity(input.scenarios.len());
    for scenario in &input.scenarios {
        match evaluate_scenario(input, scenario) {
            Ok(result) => {
                if let Some(outcome) = result.irr_outcome {
                    if result.irr.is_none() {
                        warnings.push(format!(
                            "Scenario '{}': no IRR in the search range ({})",
                            scenario.name,
                            describe(outcome)
                        ));
                    }
                }
                results.push(result);
            }
            Err(e) => {
                warnings.push(format!("Scenario '{}' failed: {e}", scenario.name));
                results.push(ScenarioResult::failed(
                    scenario,
                    input.base_synergies,
                    e.to_string(),
                ));
            }
        }
    }

    let set = ScenarioSet::from_results(results);

    let any_weighted = input.scenarios.iter().any(|s| s.probability.is_some());
    if any_weighted && (set.probability_total - Decimal::ONE).abs() > PROBABILITY_TOLERANCE {
        warnings.push(format!(
            "Scenario probabilities sum to {}, not 1; the expected IRR is not renormalized",
            set.probability_total
        ));
    }
    if any_weighted && set.expected_irr.is_none() {
        warnings.push("No weighted scenario has a defined IRR; expected IRR is undefined".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Synergy Scenario Sweep (Bisection IRR, Probability-Weighted)",
        &serde_json::json!({
            "num_scenarios": input.scenarios.len(),
            "base_synergies": input.base_synergies.to_string(),
            "discount_rate": input.discount_rate.to_string(),
            "initial_outlay": input.projection.initial_outlay.to_string(),
            "target_irr": input.target_irr.map(|t| t.to_string()),
        }),
        warnings,
        elapsed,
        set,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &SweepInput) -> DealModelResult<()> {
    if input.scenarios.is_empty() {
        return Err(DealModelError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }
    input.projection.validate()?;
    input.irr_search.validate()?;

    if input.discount_rate <= dec!(-1) {
        return Err(DealModelError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
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
        if let Some(p) = s.probability {
            if p < Decimal::ZERO || p > Decimal::ONE {
                return Err(DealModelError::invalid(
                    format!("scenario:{} probability", s.name),
                    "Probability must be between 0 and 1",
                ));
            }
        }
    }

    if input.target_irr.is_some() {
        let bracket = input.value_bracket();
        if bracket.low < Decimal::ZERO || bracket.low >= bracket.high {
            return Err(DealModelError::invalid(
                "transaction_value_bracket",
                "Bracket must satisfy 0 <= low < high",
            ));
        }
    }
    Ok(())
}

fn evaluate_scenario(
    input: &SweepInput,
    scenario: &SynergyScenario,
) -> DealModelResult<ScenarioResult> {
    if scenario.synergy_multiplier < Decimal::ZERO {
        return Err(DealModelError::invalid(
            format!("scenario:{} synergy_multiplier", scenario.name),
            "Synergy multiplier must be non-negative",
        ));
    }

    let annual_synergies = input.base_synergies * scenario.synergy_multiplier;
    let projection = ProjectionInput {
        annual_synergies,
        ..input.projection.clone()
    };
    let cash_flows = project(&projection)?;

    let outcome = bisect_irr(&cash_flows, &input.irr_search)?;
    // NPV at a fixed rate, not the solved IRR, so scenarios compare directly.
    let npv_at_discount_rate = npv(input.discount_rate, &cash_flows)?;

    let break_even_transaction_value = match input.target_irr {
        Some(target) => {
            let bracket = input.value_bracket();
            max_transaction_value(
                &projection,
                target,
                bracket.low,
                bracket.high,
                &input.irr_search,
            )?
            .threshold
        }
        None => None,
    };

    tracing::debug!(
        scenario = %scenario.name,
        multiplier = %scenario.synergy_multiplier,
        irr = ?outcome.irr(),
        npv = %npv_at_discount_rate,
        "scenario evaluated"
    );

    Ok(ScenarioResult {
        scenario_name: scenario.name.clone(),
        synergy_multiplier: scenario.synergy_multiplier,
        annual_synergies,
        probability: scenario.probability,
        irr: outcome.irr(),
        irr_outcome: Some(outcome),
        npv_at_discount_rate: Some(npv_at_discount_rate),
        cash_flows,
        break_even_transaction_value,
        failure: None,
    })
}

fn describe(outcome: IrrOutcome) -> &'static str {
    match outcome {
        IrrOutcome::AboveCeiling => "IRR exceeds the search ceiling",
        IrrOutcome::BelowFloor => "IRR is below the search floor",
        IrrOutcome::Degenerate => "stream too short",
        IrrOutcome::Converged(_) | IrrOutcome::BestEffort(_) => "converged",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
