use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DealModelError;
use crate::facts::{FinancialFacts, MarketQuote};
use crate::types::*;
use crate::DealModelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Ratios used to estimate cash-flow facts a filing did not report.
///
/// The defaults are the semiconductor-peer ratios the deal model was
/// calibrated on; every one of them can be overridden by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationPolicy {
    /// D&A as a fraction of revenue.
    pub da_pct: Rate,
    /// Per-entity D&A overrides, keyed by entity id.
    pub da_pct_overrides: BTreeMap<EntityId, Rate>,
    /// Fraction of (net income + D&A) lost to working-capital build.
    pub working_capital_haircut: Rate,
    /// Operating losses deeper than this fraction of revenue trigger the floor.
    pub loss_threshold_pct: Rate,
    /// OCF floor, as a fraction of revenue, for deep-loss entities.
    pub loss_floor_pct: Rate,
    /// CapEx as a fraction of revenue.
    pub capex_pct: Rate,
}

impl Default for EstimationPolicy {
    fn default() -> Self {
        EstimationPolicy {
            da_pct: dec!(0.03),
            da_pct_overrides: BTreeMap::new(),
            working_capital_haircut: dec!(0.10),
            loss_threshold_pct: dec!(0.10),
            loss_floor_pct: dec!(0.02),
            capex_pct: dec!(0.09),
        }
    }
}

impl EstimationPolicy {
    pub fn da_pct_for(&self, entity: &str) -> Rate {
        self.da_pct_overrides
            .get(entity)
            .copied()
            .unwrap_or(self.da_pct)
    }

    pub fn validate(&self) -> DealModelResult<()> {
        let fractions = [
            ("da_pct", self.da_pct),
            ("working_capital_haircut", self.working_capital_haircut),
            ("loss_threshold_pct", self.loss_threshold_pct),
            ("loss_floor_pct", self.loss_floor_pct),
            ("capex_pct", self.capex_pct),
        ];
        for (name, value) in fractions {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(DealModelError::invalid(
                    name,
                    "Estimation ratio must be between 0 and 1",
                ));
            }
        }
        for (entity, value) in &self.da_pct_overrides {
            if *value < Decimal::ZERO || *value > Decimal::ONE {
                return Err(DealModelError::invalid(
                    format!("da_pct_overrides.{entity}"),
                    "Estimation ratio must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }
}

/// Cash-flow figures for one entity, each tagged with whether it was
/// reported or estimated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowEstimate {
    pub entity: EntityId,
    pub depreciation_amortization: Estimated<Money>,
    pub operating_cash_flow: Estimated<Money>,
    pub capital_expenditure: Estimated<Money>,
    pub free_cash_flow: Estimated<Money>,
    pub ocf_margin: Rate,
    pub fcf_margin: Rate,
    /// Market cap / OCF; absent without a quote or when OCF <= 0.
    pub price_to_cash_flow: Option<Multiple>,
    /// Market cap / FCF; absent without a quote or when FCF <= 0.
    pub price_to_free_cash_flow: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Estimate operating cash flow from income-statement facts.
///
/// Profitable: (net income + D&A) less the working-capital haircut.
/// Loss-making: operating income + D&A, floored at `loss_floor_pct` of
/// revenue when operating losses run deeper than `loss_threshold_pct`.
pub fn estimate_operating_cash_flow(
    facts: &FinancialFacts,
    da: Money,
    policy: &EstimationPolicy,
) -> Money {
    if facts.net_income > Decimal::ZERO {
        return (facts.net_income + da) * (Decimal::ONE - policy.working_capital_haircut);
    }

    let operating_plus_da = facts.operating_income + da;
    if facts.operating_income > -(facts.revenue * policy.loss_threshold_pct) {
        operating_plus_da
    } else {
        operating_plus_da.max(facts.revenue * policy.loss_floor_pct)
    }
}

/// Reported or estimated OCF, CapEx and FCF for one entity.
pub fn estimate_cash_flows(
    entity: &str,
    facts: &FinancialFacts,
    quote: Option<&MarketQuote>,
    policy: &EstimationPolicy,
) -> DealModelResult<CashFlowEstimate> {
    policy.validate()?;
    if facts.revenue <= Decimal::ZERO {
        return Err(DealModelError::invalid(
            format!("{entity}.revenue"),
            "Revenue must be positive to estimate cash-flow margins",
        ));
    }

    // D&A is never a reported fact here; it is always the policy ratio.
    let da = Estimated::estimated(facts.revenue * policy.da_pct_for(entity));

    let operating_cash_flow = match facts.operating_cash_flow {
        Some(ocf) => Estimated::reported(ocf),
        None => Estimated::estimated(estimate_operating_cash_flow(facts, da.value, policy)),
    };

    let capital_expenditure = match facts.capital_expenditure {
        Some(capex) => Estimated::reported(capex),
        None => Estimated::estimated(facts.revenue * policy.capex_pct),
    };

    // A reported FCF wins; otherwise derive it, tagged estimated if any input was.
    let free_cash_flow = match facts.free_cash_flow {
        Some(fcf) => Estimated::reported(fcf),
        None => Estimated {
            value: operating_cash_flow.value - capital_expenditure.value,
            estimated: operating_cash_flow.estimated || capital_expenditure.estimated,
        },
    };

    let (price_to_cash_flow, price_to_free_cash_flow) = match quote {
        Some(q) => (
            ratio_if_positive(q.market_cap, operating_cash_flow.value),
            ratio_if_positive(q.market_cap, free_cash_flow.value),
        ),
        None => (None, None),
    };

    Ok(CashFlowEstimate {
        entity: entity.to_string(),
        depreciation_amortization: da,
        ocf_margin: operating_cash_flow.value / facts.revenue,
        fcf_margin: free_cash_flow.value / facts.revenue,
        operating_cash_flow,
        capital_expenditure,
        free_cash_flow,
        price_to_cash_flow,
        price_to_free_cash_flow,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::fixtures::{target_facts, target_quote};
    use rust_decimal_macros::dec;

    fn facts(revenue: Decimal, net_income: Decimal, operating_income: Decimal) -> FinancialFacts {
        let mut f = target_facts();
        f.revenue = revenue;
        f.net_income = net_income;
        f.operating_income = operating_income;
        f
    }

    #[test]
    fn test_profitable_ocf_haircut() {
        // (100 + 1000*0.03) * 0.90 = 117
        let f = facts(dec!(1000), dec!(100), dec!(150));
        let policy = EstimationPolicy::default();
        let ocf = estimate_operating_cash_flow(&f, dec!(30), &policy);
        assert_eq!(ocf, dec!(117));
    }

    #[test]
    fn test_shallow_loss_uses_operating_income() {
        // Operating loss of 5% of revenue: OCF = -50 + 30 = -20, no floor
        let f = facts(dec!(1000), dec!(-40), dec!(-50));
        let ocf = estimate_operating_cash_flow(&f, dec!(30), &EstimationPolicy::default());
        assert_eq!(ocf, dec!(-20));
    }

    #[test]
    fn test_deep_loss_is_floored() {
        // Operating loss of 30% of revenue: max(-300 + 30, 20) = 20
        let f = facts(dec!(1000), dec!(-280), dec!(-300));
        let ocf = estimate_operating_cash_flow(&f, dec!(30), &EstimationPolicy::default());
        assert_eq!(ocf, dec!(20));
    }

    #[test]
    fn test_loss_at_threshold_boundary_is_floored() {
        // Exactly -10% of revenue is not "better than" the threshold
        let f = facts(dec!(1000), dec!(-90), dec!(-100));
        let ocf = estimate_operating_cash_flow(&f, dec!(30), &EstimationPolicy::default());
        assert_eq!(ocf, dec!(20));
    }

    #[test]
    fn test_estimates_are_tagged() {
        let f = target_facts();
        let est = estimate_cash_flows("TGT", &f, None, &EstimationPolicy::default()).unwrap();

        assert!(est.operating_cash_flow.estimated);
        assert!(est.capital_expenditure.estimated);
        assert!(est.free_cash_flow.estimated);

        // D&A = 509M * 0.03 = 15.27M
        assert_eq!(est.depreciation_amortization.value, dec!(15270000));
        // OCF = (61M + 15.27M) * 0.9 = 68.643M
        assert_eq!(est.operating_cash_flow.value, dec!(68643000));
        // FCF = 68.643M - 45.81M = 22.833M
        assert_eq!(est.capital_expenditure.value, dec!(45810000));
        assert_eq!(est.free_cash_flow.value, dec!(22833000));
    }

    #[test]
    fn test_reported_facts_are_not_overridden() {
        let mut f = target_facts();
        f.operating_cash_flow = Some(dec!(69000000));
        f.free_cash_flow = Some(dec!(23000000));
        let est = estimate_cash_flows("TGT", &f, None, &EstimationPolicy::default()).unwrap();

        assert_eq!(est.operating_cash_flow, Estimated::reported(dec!(69000000)));
        assert_eq!(est.free_cash_flow, Estimated::reported(dec!(23000000)));
    }

    #[test]
    fn test_fcf_from_reported_ocf_and_capex_is_reported() {
        let mut f = target_facts();
        f.operating_cash_flow = Some(dec!(69000000));
        f.capital_expenditure = Some(dec!(46000000));
        let est = estimate_cash_flows("TGT", &f, None, &EstimationPolicy::default()).unwrap();
        assert_eq!(est.free_cash_flow, Estimated::reported(dec!(23000000)));
    }

    #[test]
    fn test_per_entity_da_override() {
        let mut policy = EstimationPolicy::default();
        policy.da_pct_overrides.insert("TGT".into(), dec!(0.05));
        let est = estimate_cash_flows("TGT", &target_facts(), None, &policy).unwrap();
        assert_eq!(est.depreciation_amortization.value, dec!(25450000));
    }

    #[test]
    fn test_price_multiples() {
        let quote = target_quote();
        let est = estimate_cash_flows(
            "TGT",
            &target_facts(),
            Some(&quote),
            &EstimationPolicy::default(),
        )
        .unwrap();
        assert!(est.price_to_cash_flow.is_some());
        assert!(est.price_to_free_cash_flow.is_some());
    }

    #[test]
    fn test_negative_fcf_has_no_price_multiple() {
        let quote = target_quote();
        let f = facts(dec!(1000), dec!(-40), dec!(-50));
        let est = estimate_cash_flows("TGT", &f, Some(&quote), &EstimationPolicy::default())
            .unwrap();
        assert!(est.free_cash_flow.value < Decimal::ZERO);
        assert!(est.price_to_free_cash_flow.is_none());
        assert!(est.price_to_cash_flow.is_none());
    }

    #[test]
    fn test_zero_revenue_rejected() {
        let f = facts(Decimal::ZERO, dec!(1), dec!(1));
        assert!(estimate_cash_flows("TGT", &f, None, &EstimationPolicy::default()).is_err());
    }
}
