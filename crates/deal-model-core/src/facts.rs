use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DealModelError;
use crate::types::*;
use crate::DealModelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Statement facts for one entity, as supplied by the filings source.
///
/// Balance-sheet figures are non-negative; `net_income` and
/// `operating_income` may be negative. The optional cash-flow facts are
/// absent when the filing did not report them and must then be estimated
/// (see `ma::estimation`), never read as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialFacts {
    pub revenue: Money,
    pub net_income: Money,
    pub operating_income: Money,
    pub total_assets: Money,
    pub total_debt: Money,
    pub stockholders_equity: Money,
    pub cash: Money,
    pub shares_outstanding: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expenditure: Option<Money>,

    /// End of the fiscal period the facts were reported for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_period_end: Option<NaiveDate>,
}

/// Market snapshot for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub current_price: Money,
    pub market_cap: Money,
    /// Market-data cash figure; may differ from statement cash.
    pub cash: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

/// Read access to per-entity facts and quotes.
///
/// Implementations own the data; the engine only borrows it for the
/// duration of one computation.
pub trait FactStore {
    fn financial_facts(&self, id: &str) -> Option<&FinancialFacts>;

    fn market_quote(&self, id: &str) -> Option<&MarketQuote>;

    fn require_facts(&self, id: &str) -> DealModelResult<&FinancialFacts> {
        self.financial_facts(id).ok_or_else(|| {
            DealModelError::InsufficientData(format!("No financial facts for entity '{id}'"))
        })
    }

    fn require_quote(&self, id: &str) -> DealModelResult<&MarketQuote> {
        self.market_quote(id).ok_or_else(|| {
            DealModelError::InsufficientData(format!("No market quote for entity '{id}'"))
        })
    }
}

/// A fact store snapshot held in memory, keyed by entity id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryFactStore {
    #[serde(default)]
    pub financials: BTreeMap<EntityId, FinancialFacts>,
    #[serde(default)]
    pub quotes: BTreeMap<EntityId, MarketQuote>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(
        mut self,
        id: impl Into<EntityId>,
        facts: FinancialFacts,
        quote: MarketQuote,
    ) -> Self {
        let id = id.into();
        self.financials.insert(id.clone(), facts);
        self.quotes.insert(id, quote);
        self
    }
}

impl FactStore for InMemoryFactStore {
    fn financial_facts(&self, id: &str) -> Option<&FinancialFacts> {
        self.financials.get(id)
    }

    fn market_quote(&self, id: &str) -> Option<&MarketQuote> {
        self.quotes.get(id)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl FinancialFacts {
    /// Check the sign constraints on balance-sheet facts.
    ///
    /// `entity` prefixes the field name in the returned error.
    pub fn validate(&self, entity: &str) -> DealModelResult<()> {
        let non_negative = [
            ("revenue", self.revenue),
            ("total_assets", self.total_assets),
            ("total_debt", self.total_debt),
            ("stockholders_equity", self.stockholders_equity),
            ("cash", self.cash),
            ("shares_outstanding", self.shares_outstanding),
        ];
        for (name, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(DealModelError::invalid(
                    format!("{entity}.{name}"),
                    "Must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

impl MarketQuote {
    pub fn validate(&self, entity: &str) -> DealModelResult<()> {
        if self.current_price < Decimal::ZERO {
            return Err(DealModelError::invalid(
                format!("{entity}.current_price"),
                "Share price must be non-negative",
            ));
        }
        if self.market_cap < Decimal::ZERO {
            return Err(DealModelError::invalid(
                format!("{entity}.market_cap"),
                "Market cap must be non-negative",
            ));
        }
        Ok(())
    }
}
