use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::TransactionAssumptions;
use crate::error::DealModelError;
use crate::facts::{FinancialFacts, MarketQuote};
use crate::types::*;
use crate::DealModelResult;

/// Fiscal periods further apart than this are flagged as not comparable.
const MAX_PERIOD_GAP_DAYS: i64 = 366;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One side of the deal: its id plus borrowed facts and quote.
#[derive(Debug, Clone, Copy)]
pub struct DealParty<'a> {
    pub id: &'a str,
    pub facts: &'a FinancialFacts,
    pub quote: &'a MarketQuote,
}

/// Combined financials as if an all-cash acquisition had closed.
///
/// Ratios are decimals (0.25 = 25%). A ratio with a non-positive
/// denominator is `None`, never zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProFormaResult {
    // --- Seller side ---
    pub target_current_price: Money,
    pub offer_price: Money,
    pub premium_amount: Money,
    /// Offer price * target shares outstanding.
    pub transaction_value: Money,

    // --- Per-entity build-up ---
    pub acquirer_ebitda: Money,
    pub target_ebitda: Money,
    pub acquirer_interest_expense: Money,
    pub target_interest_expense: Money,

    // --- Buyer side, combined ---
    pub pro_forma_net_income: Money,
    pub pro_forma_ebitda: Money,
    pub pro_forma_debt: Money,
    /// May be negative: the combined cash cannot fund the purchase.
    pub pro_forma_cash: Money,
    pub pro_forma_equity: Money,
    /// Transaction value less target book equity. Negative is a bargain purchase.
    pub goodwill: Money,
    pub is_bargain_purchase: bool,
    pub pro_forma_interest_expense: Money,
    pub net_debt: Money,
    pub total_capitalization_book: Money,
    pub total_capitalization_market: Money,

    // --- Ratios ---
    pub pe_ratio: Option<Multiple>,
    pub debt_to_ebitda: Option<Multiple>,
    pub ebitda_to_interest: Option<Multiple>,
    pub debt_to_capitalization_book: Option<Rate>,
    pub debt_to_capitalization_market: Option<Rate>,
    pub net_debt_to_capitalization: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// EBITDA as operating income plus D&A at the entity's assumed ratio.
///
/// This is the only derivation used, even when the filing reports EBITDA,
/// so that both entities are measured the same way.
pub fn derive_ebitda(
    entity: &str,
    facts: &FinancialFacts,
    assumptions: &TransactionAssumptions,
) -> DealModelResult<Money> {
    let da_pct = assumptions.da_pct(entity)?;
    Ok(facts.operating_income + facts.revenue * da_pct)
}

/// Consolidate acquirer and target into pro forma combined metrics under an
/// all-cash structure with no incremental acquisition debt.
pub fn consolidate(
    acquirer: DealParty<'_>,
    target: DealParty<'_>,
    assumptions: &TransactionAssumptions,
    annual_synergies: Money,
) -> DealModelResult<ComputationOutput<ProFormaResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // ------------------------------------------------------------------
    // 1. Validate inputs
    // ------------------------------------------------------------------
    validate_input(&acquirer, &target, assumptions)?;
    check_period_alignment(&acquirer, &target, &mut warnings);

    let result = build_pro_forma(&acquirer, &target, assumptions, annual_synergies)?;

    if result.pro_forma_cash < Decimal::ZERO {
        warnings.push(format!(
            "Pro forma cash is negative ({}); combined cash cannot fund an all-cash purchase",
            result.pro_forma_cash
        ));
    }
    if result.is_bargain_purchase {
        warnings.push(format!(
            "Transaction value is below target book equity; negative goodwill of {}",
            result.goodwill
        ));
    }
    if result.pe_ratio.is_none() {
        warnings.push("Pro forma net income is not positive; P/E is undefined".into());
    }
    if result.debt_to_ebitda.is_none() {
        warnings.push("Pro forma EBITDA is not positive; Debt/EBITDA is undefined".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pro Forma Consolidation (All-Cash)",
        &serde_json::json!({
            "acquirer": acquirer.id,
            "target": target.id,
            "premium_pct": assumptions.premium_pct.to_string(),
            "tax_rate": assumptions.tax_rate.to_string(),
            "interest_rate": assumptions.interest_rate.to_string(),
            "annual_synergies": annual_synergies.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// The consolidation arithmetic without the envelope. Assumes validated input.
pub(crate) fn build_pro_forma(
    acquirer: &DealParty<'_>,
    target: &DealParty<'_>,
    assumptions: &TransactionAssumptions,
    annual_synergies: Money,
) -> DealModelResult<ProFormaResult> {
    let one = Decimal::ONE;
    let a = acquirer.facts;
    let t = target.facts;

    // ------------------------------------------------------------------
    // 2. Offer & transaction value
    // ------------------------------------------------------------------
    let target_current_price = target.quote.current_price;
    let offer_price = target_current_price * (one + assumptions.premium_pct);
    let premium_amount = offer_price - target_current_price;
    let transaction_value = offer_price * t.shares_outstanding;

    // ------------------------------------------------------------------
    // 3. Earnings: synergies flow through EBITDA at 100% margin and into
    //    net income after tax
    // ------------------------------------------------------------------
    let acquirer_ebitda = derive_ebitda(acquirer.id, a, assumptions)?;
    let target_ebitda = derive_ebitda(target.id, t, assumptions)?;
    let pro_forma_ebitda = acquirer_ebitda + target_ebitda + annual_synergies;
    let pro_forma_net_income =
        a.net_income + t.net_income + annual_synergies * (one - assumptions.tax_rate);

    // ------------------------------------------------------------------
    // 4. Balance sheet
    // ------------------------------------------------------------------
    let pro_forma_debt = a.total_debt + t.total_debt;
    let pro_forma_cash = acquirer.quote.cash + target.quote.cash - transaction_value;
    let goodwill = transaction_value - t.stockholders_equity;
    let pro_forma_equity = a.stockholders_equity - transaction_value + goodwill;

    // ------------------------------------------------------------------
    // 5. Interest on pre-existing debt only
    // ------------------------------------------------------------------
    let acquirer_interest_expense = a.total_debt * assumptions.interest_rate;
    let target_interest_expense = t.total_debt * assumptions.interest_rate;
    let pro_forma_interest_expense = acquirer_interest_expense + target_interest_expense;

    // ------------------------------------------------------------------
    // 6. Ratios
    // ------------------------------------------------------------------
    let net_debt = pro_forma_debt - pro_forma_cash;
    let total_capitalization_book = pro_forma_debt + pro_forma_equity;
    let total_capitalization_market = pro_forma_debt + acquirer.quote.market_cap;

    Ok(ProFormaResult {
        target_current_price,
        offer_price,
        premium_amount,
        transaction_value,
        acquirer_ebitda,
        target_ebitda,
        acquirer_interest_expense,
        target_interest_expense,
        pro_forma_net_income,
        pro_forma_ebitda,
        pro_forma_debt,
        pro_forma_cash,
        pro_forma_equity,
        goodwill,
        is_bargain_purchase: goodwill < Decimal::ZERO,
        pro_forma_interest_expense,
        net_debt,
        total_capitalization_book,
        total_capitalization_market,
        pe_ratio: ratio_if_positive(acquirer.quote.market_cap, pro_forma_net_income),
        debt_to_ebitda: ratio_if_positive(pro_forma_debt, pro_forma_ebitda),
        ebitda_to_interest: ratio_if_positive(pro_forma_ebitda, pro_forma_interest_expense),
        debt_to_capitalization_book: ratio_if_positive(pro_forma_debt, total_capitalization_book),
        debt_to_capitalization_market: ratio_if_positive(
            pro_forma_debt,
            total_capitalization_market,
        ),
        net_debt_to_capitalization: ratio_if_positive(net_debt, total_capitalization_book),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(
    acquirer: &DealParty<'_>,
    target: &DealParty<'_>,
    assumptions: &TransactionAssumptions,
) -> DealModelResult<()> {
    assumptions.validate()?;

    if target.facts.shares_outstanding <= Decimal::ZERO {
        return Err(DealModelError::InvalidInput {
            field: format!("{}.shares_outstanding", target.id),
            reason: "Target shares outstanding must be positive".into(),
        });
    }
    if target.quote.current_price <= Decimal::ZERO {
        return Err(DealModelError::InvalidInput {
            field: format!("{}.current_price", target.id),
            reason: "Target share price must be positive".into(),
        });
    }
    if acquirer.id == target.id {
        return Err(DealModelError::InvalidInput {
            field: "target".into(),
            reason: "Acquirer and target must be different entities".into(),
        });
    }

    acquirer.facts.validate(acquirer.id)?;
    acquirer.quote.validate(acquirer.id)?;
    target.facts.validate(target.id)?;
    target.quote.validate(target.id)?;
    Ok(())
}

fn check_period_alignment(
    acquirer: &DealParty<'_>,
    target: &DealParty<'_>,
    warnings: &mut Vec<String>,
) {
    if let (Some(a), Some(t)) = (
        acquirer.facts.fiscal_period_end,
        target.facts.fiscal_period_end,
    ) {
        let gap = (a - t).num_days().abs();
        if gap > MAX_PERIOD_GAP_DAYS {
            warnings.push(format!(
                "Fiscal periods differ by {gap} days ({} vs {}); combined figures mix periods",
                a, t
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::fixtures::base_assumptions;
    use crate::facts::fixtures::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn run(
        a_facts: &FinancialFacts,
        a_quote: &MarketQuote,
        t_facts: &FinancialFacts,
        t_quote: &MarketQuote,
        synergies: Money,
    ) -> DealModelResult<ComputationOutput<ProFormaResult>> {
        consolidate(
            DealParty {
                id: "ACQ",
                facts: a_facts,
                quote: a_quote,
            },
            DealParty {
                id: "TGT",
                facts: t_facts,
                quote: t_quote,
            },
            &base_assumptions(),
            synergies,
        )
    }

    #[test]
    fn test_offer_price_and_transaction_value() {
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            dec!(123200000),
        )
        .unwrap();
        let out = &result.result;

        assert_eq!(out.offer_price, dec!(13.0));
        assert_eq!(out.premium_amount, dec!(3.0));
        assert_eq!(out.transaction_value, dec!(3900000000));
    }

    #[test]
    fn test_goodwill_identity() {
        let t = target_facts();
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &t,
            &target_quote(),
            dec!(123200000),
        )
        .unwrap();
        let out = &result.result;

        assert_eq!(out.goodwill, out.transaction_value - t.stockholders_equity);
        assert_eq!(out.goodwill, dec!(3200000000));
        assert!(!out.is_bargain_purchase);
    }

    #[test]
    fn test_negative_goodwill_not_clamped() {
        let mut t = target_facts();
        t.stockholders_equity = dec!(5000000000);
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &t,
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        let out = &result.result;

        assert_eq!(out.goodwill, dec!(-1100000000));
        assert!(out.is_bargain_purchase);
        assert!(result.warnings.iter().any(|w| w.contains("negative goodwill")));
    }

    #[test]
    fn test_ebitda_uses_da_ratio_not_reported_fact() {
        let mut t = target_facts();
        t.ebitda = Some(dec!(999999999));
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &t,
            &target_quote(),
            dec!(100000000),
        )
        .unwrap();
        let out = &result.result;

        // Target: 30M + 509M * 0.03 = 45.27M
        assert_eq!(out.target_ebitda, dec!(45270000));
        // Acquirer: 33B + 60B * 0.02 = 34.2B
        assert_eq!(out.acquirer_ebitda, dec!(34200000000));
        // Combined + synergies at 100% margin
        assert_eq!(out.pro_forma_ebitda, dec!(34345270000));
    }

    #[test]
    fn test_net_income_adds_after_tax_synergies() {
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            dec!(100000000),
        )
        .unwrap();
        // 30B + 61M + 100M * 0.79
        assert_eq!(result.result.pro_forma_net_income, dec!(30140000000));
    }

    #[test]
    fn test_balance_sheet_and_interest() {
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        let out = &result.result;

        assert_eq!(out.pro_forma_debt, dec!(9700000000));
        // Market cash: 26B + 0.12B - 3.9B
        assert_eq!(out.pro_forma_cash, dec!(22220000000));
        // 43B - 3.9B + 3.2B
        assert_eq!(out.pro_forma_equity, dec!(42300000000));
        // 9.7B * 4%
        assert_eq!(out.pro_forma_interest_expense, dec!(388000000));
        assert_eq!(out.target_interest_expense, Decimal::ZERO);
    }

    #[test]
    fn test_book_and_market_capitalization_are_distinct() {
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        let out = &result.result;

        // Book: 9.7 / (9.7 + 42.3) = 0.186538...
        let book = out.debt_to_capitalization_book.unwrap();
        assert!((book - dec!(0.1865)).abs() < dec!(0.0001));
        // Market: 9.7 / (9.7 + 4400)
        let market = out.debt_to_capitalization_market.unwrap();
        assert!(market < dec!(0.003));
        assert_ne!(book, market);

        // Net debt negative with a large cash pile: 9.7B - 22.22B
        assert_eq!(out.net_debt, dec!(-12520000000));
        assert!(out.net_debt_to_capitalization.unwrap() < Decimal::ZERO);
    }

    #[test]
    fn test_negative_pro_forma_cash_is_surfaced() {
        let mut q = acquirer_quote();
        q.cash = dec!(1000000000);
        let result = run(
            &acquirer_facts(),
            &q,
            &target_facts(),
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();

        // 1B + 0.12B - 3.9B
        assert_eq!(result.result.pro_forma_cash, dec!(-2780000000));
        assert!(result.warnings.iter().any(|w| w.contains("Pro forma cash is negative")));
    }

    #[test]
    fn test_undefined_ratios_are_none() {
        let mut a = acquirer_facts();
        a.net_income = dec!(-40000000000);
        a.operating_income = dec!(-40000000000);
        a.total_debt = Decimal::ZERO;
        let result = run(
            &a,
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        let out = &result.result;

        assert!(out.pe_ratio.is_none());
        assert!(out.debt_to_ebitda.is_none());
        // No debt => no interest => coverage undefined
        assert!(out.ebitda_to_interest.is_none());
    }

    #[test]
    fn test_zero_target_shares_is_invalid() {
        let mut t = target_facts();
        t.shares_outstanding = Decimal::ZERO;
        let err = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &t,
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap_err();
        match err {
            DealModelError::InvalidInput { field, .. } => {
                assert_eq!(field, "TGT.shares_outstanding")
            }
            other => panic!("Expected InvalidInput error, got: {other}"),
        }
    }

    #[test]
    fn test_missing_da_ratio_is_invalid() {
        let mut assumptions = base_assumptions();
        assumptions.da_pct_by_entity.remove("TGT");
        let (a, aq, t, tq) = (
            acquirer_facts(),
            acquirer_quote(),
            target_facts(),
            target_quote(),
        );
        let result = consolidate(
            DealParty {
                id: "ACQ",
                facts: &a,
                quote: &aq,
            },
            DealParty {
                id: "TGT",
                facts: &t,
                quote: &tq,
            },
            &assumptions,
            Decimal::ZERO,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_fiscal_periods_warn() {
        let mut t = target_facts();
        t.fiscal_period_end = NaiveDate::from_ymd_opt(2021, 12, 31);
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &t,
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("Fiscal periods differ")));
    }

    #[test]
    fn test_methodology_string() {
        let result = run(
            &acquirer_facts(),
            &acquirer_quote(),
            &target_facts(),
            &target_quote(),
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(result.methodology, "Pro Forma Consolidation (All-Cash)");
    }
}
