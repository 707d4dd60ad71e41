use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::TransactionAssumptions;
use crate::facts::FactStore;
use crate::ma::estimation::{estimate_cash_flows, CashFlowEstimate, EstimationPolicy};
use crate::ma::pro_forma::{consolidate, DealParty, ProFormaResult};
use crate::ma::projection::ProjectionInput;
use crate::scenarios::break_even::{
    find_break_even, BreakEvenDimension, BreakEvenInput, BreakEvenResult,
};
use crate::scenarios::sweep::{sweep, ScenarioSet, SweepInput, SynergyScenario, ValueBracket};
use crate::time_value::IrrSearch;
use crate::types::*;
use crate::DealModelResult;

fn standard_scenarios() -> Vec<SynergyScenario> {
    SynergyScenario::standard_set()
}

fn default_multiplier_range() -> MultiplierRange {
    MultiplierRange {
        low: Decimal::ZERO,
        high: dec!(5),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MultiplierRange {
    pub low: Multiple,
    pub high: Multiple,
}

/// What to analyse: which entities, which synergy cases, what hurdle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysisInput {
    pub acquirer: EntityId,
    pub target: EntityId,
    /// Annual pre-tax synergies at a multiplier of 1.0.
    pub base_synergies: Money,
    #[serde(default = "standard_scenarios")]
    pub scenarios: Vec<SynergyScenario>,
    /// Rate for the per-scenario NPV column (decimal).
    pub discount_rate: Rate,
    /// Hurdle IRR (decimal). Enables both break-even searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_irr: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_value_bracket: Option<ValueBracket>,
    #[serde(default = "default_multiplier_range")]
    pub synergy_multiplier_range: MultiplierRange,
    #[serde(default)]
    pub irr_search: IrrSearch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub pro_forma: ProFormaResult,
    pub target_cash_flows: CashFlowEstimate,
    /// Base-case projection inputs shared by every scenario.
    pub projection: ProjectionInput,
    pub scenarios: ScenarioSet,
    /// Lowest synergy multiplier reaching `target_irr` at the actual price.
    pub synergy_break_even: Option<BreakEvenResult>,
}

/// Run the whole pipeline for one acquirer/target pair: consolidate, estimate
/// the target's recurring cash flow, project, sweep the synergy cases and,
/// given a hurdle, search for the break-even synergy level.
///
/// The target's free cash flow (reported, else estimated) is the base
/// recurring cash flow; its derived EBITDA anchors the terminal value; the
/// transaction value is the initial outlay.
pub fn analyze_deal(
    store: &impl FactStore,
    assumptions: &TransactionAssumptions,
    policy: &EstimationPolicy,
    input: &DealAnalysisInput,
) -> DealModelResult<ComputationOutput<DealAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let acquirer = DealParty {
        id: &input.acquirer,
        facts: store.require_facts(&input.acquirer)?,
        quote: store.require_quote(&input.acquirer)?,
    };
    let target = DealParty {
        id: &input.target,
        facts: store.require_facts(&input.target)?,
        quote: store.require_quote(&input.target)?,
    };

    // ------------------------------------------------------------------
    // 1. Pro forma
    // ------------------------------------------------------------------
    let pro_forma = consolidate(acquirer, target, assumptions, input.base_synergies)?;
    warnings.extend(pro_forma.warnings);
    let pro_forma = pro_forma.result;

    // ------------------------------------------------------------------
    // 2. Target recurring cash flow
    // ------------------------------------------------------------------
    let target_cash_flows =
        estimate_cash_flows(&input.target, target.facts, Some(target.quote), policy)?;
    if target_cash_flows.free_cash_flow.estimated {
        warnings.push(format!(
            "Free cash flow for '{}' is estimated ({}), not reported",
            input.target, target_cash_flows.free_cash_flow.value
        ));
    }

    let projection = ProjectionInput::from_assumptions(
        assumptions,
        target_cash_flows.free_cash_flow.value,
        input.base_synergies,
        pro_forma.target_ebitda,
        pro_forma.transaction_value,
    );

    tracing::info!(
        acquirer = %input.acquirer,
        target = %input.target,
        transaction_value = %pro_forma.transaction_value,
        base_cash_flow = %projection.base_annual_cash_flow,
        "deal consolidated; sweeping synergy scenarios"
    );

    // ------------------------------------------------------------------
    // 3. Scenarios
    // ------------------------------------------------------------------
    let scenarios = sweep(&SweepInput {
        scenarios: input.scenarios.clone(),
        base_synergies: input.base_synergies,
        projection: projection.clone(),
        discount_rate: input.discount_rate,
        irr_search: input.irr_search.clone(),
        target_irr: input.target_irr,
        transaction_value_bracket: input.transaction_value_bracket,
    })?;
    warnings.extend(scenarios.warnings);

    // ------------------------------------------------------------------
    // 4. Break-even synergies
    // ------------------------------------------------------------------
    let synergy_break_even = match input.target_irr {
        Some(target_irr) => {
            let out = find_break_even(&BreakEvenInput {
                projection: projection.clone(),
                target_irr,
                dimension: BreakEvenDimension::SynergyMultiplier {
                    base_synergies: input.base_synergies,
                    low: input.synergy_multiplier_range.low,
                    high: input.synergy_multiplier_range.high,
                },
                tolerance: dec!(0.000001),
                max_iterations: 100,
                irr_search: input.irr_search.clone(),
            })?;
            warnings.extend(out.warnings);
            Some(out.result)
        }
        None => None,
    };

    let analysis = DealAnalysis {
        pro_forma,
        target_cash_flows,
        projection,
        scenarios: scenarios.result,
        synergy_break_even,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "End-to-End M&A Deal Analysis (All-Cash)",
        &serde_json::json!({
            "acquirer": input.acquirer,
            "target": input.target,
            "base_synergies": input.base_synergies.to_string(),
            "discount_rate": input.discount_rate.to_string(),
            "target_irr": input.target_irr.map(|t| t.to_string()),
            "assumptions": assumptions,
        }),
        warnings,
        elapsed,
        analysis,
    ))
}
