use deal_model_core::assumptions::TransactionAssumptions;
use deal_model_core::facts::{FactStore, FinancialFacts, InMemoryFactStore, MarketQuote};
use deal_model_core::ma::deal::{analyze_deal, DealAnalysisInput};
use deal_model_core::ma::estimation::EstimationPolicy;
use deal_model_core::ma::pro_forma::{consolidate, DealParty};
use deal_model_core::ma::projection::{project, ProjectionInput};
use deal_model_core::scenarios::sweep::{sweep, SweepInput, SynergyScenario};
use deal_model_core::time_value::{npv, solve_irr};
use deal_model_core::DealModelError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn facts(revenue: Decimal, net_income: Decimal, operating_income: Decimal) -> FinancialFacts {
    FinancialFacts {
        revenue,
        net_income,
        operating_income,
        total_assets: revenue * dec!(2),
        total_debt: Decimal::ZERO,
        stockholders_equity: revenue,
        cash: Decimal::ZERO,
        shares_outstanding: dec!(1000000),
        ebitda: None,
        operating_cash_flow: None,
        free_cash_flow: None,
        capital_expenditure: None,
        fiscal_period_end: None,
    }
}

fn quote(price: Decimal, market_cap: Decimal, cash: Decimal) -> MarketQuote {
    MarketQuote {
        current_price: price,
        market_cap,
        cash,
        pe_ratio: None,
        pb_ratio: None,
        enterprise_value: None,
        as_of: None,
    }
}

fn assumptions() -> TransactionAssumptions {
    serde_json::from_value(serde_json::json!({
        "premium_pct": "0.30",
        "tax_rate": "0.21",
        "interest_rate": "0.04",
        "da_pct_by_entity": { "BIG": "0.02", "SMALL": "0.03" },
        "terminal_multiple": "20",
        "holding_period_years": 7,
        "base_growth_rate": "0.03",
        "synergy_growth_rate": "0.05"
    }))
    .unwrap()
}

fn store() -> InMemoryFactStore {
    let mut big = facts(dec!(60000000000), dec!(30000000000), dec!(33000000000));
    big.total_debt = dec!(9700000000);
    big.stockholders_equity = dec!(43000000000);
    big.shares_outstanding = dec!(24500000000);

    let mut small = facts(dec!(509000000), dec!(61000000), dec!(30000000));
    small.stockholders_equity = dec!(700000000);
    small.shares_outstanding = dec!(300000000);

    InMemoryFactStore::new()
        .with_entity(
            "BIG",
            big,
            quote(dec!(180), dec!(4400000000000), dec!(26000000000)),
        )
        .with_entity(
            "SMALL",
            small,
            quote(dec!(10.0), dec!(3000000000), dec!(120000000)),
        )
}

// ===========================================================================
// Pro forma
// ===========================================================================

#[test]
fn test_offer_price_and_transaction_value_exact() {
    let store = store();
    let party = |id: &'static str| DealParty {
        id,
        facts: store.require_facts(id).unwrap(),
        quote: store.require_quote(id).unwrap(),
    };
    let out = consolidate(party("BIG"), party("SMALL"), &assumptions(), dec!(123200000)).unwrap();

    assert_eq!(out.result.offer_price, dec!(13.0));
    assert_eq!(out.result.transaction_value, dec!(3900000000));
    assert_eq!(
        out.result.goodwill,
        out.result.transaction_value - dec!(700000000)
    );
}

#[test]
fn test_zero_shares_target_fails_consolidation() {
    let mut store = store();
    if let Some(f) = store.financials.get_mut("SMALL") {
        f.shares_outstanding = Decimal::ZERO;
    }
    let big = DealParty {
        id: "BIG",
        facts: store.require_facts("BIG").unwrap(),
        quote: store.require_quote("BIG").unwrap(),
    };
    let small = DealParty {
        id: "SMALL",
        facts: store.require_facts("SMALL").unwrap(),
        quote: store.require_quote("SMALL").unwrap(),
    };
    let err = consolidate(big, small, &assumptions(), Decimal::ZERO).unwrap_err();
    assert!(matches!(err, DealModelError::InvalidInput { .. }));
}

// ===========================================================================
// IRR solver
// ===========================================================================

#[test]
fn test_irr_ten_percent() {
    let irr = solve_irr(&[dec!(-100), dec!(110)]).unwrap();
    assert!((irr - dec!(10.0)).abs() < dec!(0.0001));
}

#[test]
fn test_irr_positive_npv_at_ceiling_is_none() {
    assert_eq!(solve_irr(&[dec!(-1), dec!(0), dec!(5000)]), None);
}

#[test]
fn test_five_year_stream_zeroes_npv() {
    let cfs = [
        dec!(-1000),
        dec!(200),
        dec!(200),
        dec!(200),
        dec!(200),
        dec!(1200),
    ];
    let irr = solve_irr(&cfs).unwrap();
    let residual = npv(irr / dec!(100), &cfs).unwrap();
    assert!(residual.abs() < dec!(0.0001), "NPV at IRR = {residual}");
}

// ===========================================================================
// Projection -> sweep
// ===========================================================================

fn projection() -> ProjectionInput {
    ProjectionInput::from_assumptions(
        &assumptions(),
        dec!(23000000),
        dec!(123200000),
        dec!(45270000),
        dec!(3900000000),
    )
}

#[test]
fn test_projection_length_and_outlay() {
    let cfs = project(&projection()).unwrap();
    assert_eq!(cfs.len(), 8);
    assert_eq!(cfs[0], dec!(-3900000000));
    assert!(cfs[1..].iter().all(|cf| *cf > Decimal::ZERO));
}

#[test]
fn test_sweep_weighted_expectation() {
    let out = sweep(&SweepInput {
        scenarios: vec![
            SynergyScenario::new("Half", dec!(0.5), dec!(0.3)),
            SynergyScenario::new("Full", dec!(1.0), dec!(0.4)),
            SynergyScenario::new("Double", dec!(2.0), dec!(0.3)),
        ],
        base_synergies: dec!(123200000),
        projection: projection(),
        discount_rate: dec!(0.10),
        irr_search: Default::default(),
        target_irr: None,
        transaction_value_bracket: None,
    })
    .unwrap();

    let set = &out.result;
    let irrs: Vec<Decimal> = set.results.iter().map(|r| r.irr.unwrap()).collect();
    let manual = dec!(0.3) * irrs[0] + dec!(0.4) * irrs[1] + dec!(0.3) * irrs[2];
    assert!((set.expected_irr.unwrap() - manual).abs() < dec!(0.0000001));
    assert!(set.excluded_scenarios.is_empty());

    // NPV at 10% rises with synergies
    let npvs: Vec<Decimal> = set
        .results
        .iter()
        .map(|r| r.npv_at_discount_rate.unwrap())
        .collect();
    assert!(npvs[0] < npvs[1] && npvs[1] < npvs[2]);
}

// ===========================================================================
// End to end
// ===========================================================================

#[test]
fn test_analyze_deal_from_json() {
    let input: DealAnalysisInput = serde_json::from_value(serde_json::json!({
        "acquirer": "BIG",
        "target": "SMALL",
        "base_synergies": "123200000",
        "discount_rate": "0.10",
        "target_irr": "0.10"
    }))
    .unwrap();

    let out = analyze_deal(
        &store(),
        &assumptions(),
        &EstimationPolicy::default(),
        &input,
    )
    .unwrap();
    let a = &out.result;

    assert_eq!(a.pro_forma.transaction_value, dec!(3900000000));
    assert_eq!(a.scenarios.results.len(), 6);
    assert_eq!(a.projection.base_annual_cash_flow, dec!(22833000));
    assert!(a.target_cash_flows.free_cash_flow.estimated);

    let be = a.synergy_break_even.as_ref().unwrap();
    let threshold = be.threshold.unwrap();
    // Synergies below base fall short of a 10% return at this price
    let base = a
        .scenarios
        .results
        .iter()
        .find(|r| r.scenario_name == "Base")
        .unwrap();
    if base.irr.unwrap() >= dec!(10) {
        assert!(threshold <= dec!(1.0));
    } else {
        assert!(threshold > dec!(1.0));
    }
}
