use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DealModelError;
use crate::types::*;
use crate::DealModelResult;

/// Every scalar a deal computation depends on, passed explicitly into each
/// call. Nothing in the engine reads a module-level constant in its place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionAssumptions {
    /// Premium over the target's current price (0.30 = 30%).
    pub premium_pct: Rate,
    pub tax_rate: Rate,
    /// Flat rate applied to each entity's pre-deal debt.
    pub interest_rate: Rate,
    /// D&A as a fraction of revenue, per entity id. Only used to derive EBITDA.
    pub da_pct_by_entity: BTreeMap<EntityId, Rate>,
    /// Exit EV/EBITDA multiple for the terminal value.
    pub terminal_multiple: Multiple,
    pub holding_period_years: Years,
    /// Annual growth of the base recurring cash flow.
    pub base_growth_rate: Rate,
    /// Annual growth of realised synergies.
    pub synergy_growth_rate: Rate,
}

impl TransactionAssumptions {
    pub fn validate(&self) -> DealModelResult<()> {
        let one = Decimal::ONE;

        if self.tax_rate < Decimal::ZERO || self.tax_rate > one {
            return Err(DealModelError::invalid(
                "tax_rate",
                "Tax rate must be between 0 and 1",
            ));
        }
        if self.premium_pct <= -one {
            return Err(DealModelError::invalid(
                "premium_pct",
                "Premium must be greater than -100%",
            ));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(DealModelError::invalid(
                "interest_rate",
                "Interest rate must be non-negative",
            ));
        }
        if self.terminal_multiple < Decimal::ZERO {
            return Err(DealModelError::invalid(
                "terminal_multiple",
                "Terminal multiple must be non-negative",
            ));
        }
        if self.holding_period_years == 0 {
            return Err(DealModelError::invalid(
                "holding_period_years",
                "Holding period must be at least one year",
            ));
        }
        if self.base_growth_rate <= -one {
            return Err(DealModelError::invalid(
                "base_growth_rate",
                "Growth rate must be greater than -100%",
            ));
        }
        if self.synergy_growth_rate <= -one {
            return Err(DealModelError::invalid(
                "synergy_growth_rate",
                "Growth rate must be greater than -100%",
            ));
        }
        for (entity, pct) in &self.da_pct_by_entity {
            if *pct < Decimal::ZERO || *pct > one {
                return Err(DealModelError::invalid(
                    format!("da_pct_by_entity.{entity}"),
                    "D&A ratio must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }

    /// D&A ratio for `entity`. A missing entry is an input error: EBITDA for
    /// that entity cannot be derived consistently with the others.
    pub fn da_pct(&self, entity: &str) -> DealModelResult<Rate> {
        self.da_pct_by_entity.get(entity).copied().ok_or_else(|| {
            DealModelError::invalid(
                format!("da_pct_by_entity.{entity}"),
                "No D&A ratio supplied for entity",
            )
        })
    }
}
