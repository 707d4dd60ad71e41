use serde::{Deserialize, Serialize};

use deal_model_core::assumptions::TransactionAssumptions;
use deal_model_core::ma::estimation::EstimationPolicy;

use crate::input;

/// Deal configuration file: the transaction assumptions plus an optional
/// estimation policy (defaults apply when omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealConfig {
    pub assumptions: TransactionAssumptions,
    #[serde(default)]
    pub estimation: EstimationPolicy,
}

/// Load and validate a YAML or JSON deal configuration.
pub fn load_config(path: &str) -> Result<DealConfig, Box<dyn std::error::Error>> {
    let config: DealConfig = input::file::read_document(path)?;
    config.assumptions.validate()?;
    config.estimation.validate()?;
    tracing::debug!(
        path,
        entities = config.assumptions.da_pct_by_entity.len(),
        "deal configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_config_with_default_estimation() {
        let yaml = r#"
assumptions:
  premium_pct: "0.30"
  tax_rate: "0.21"
  interest_rate: "0.04"
  da_pct_by_entity:
    ACQ: "0.02"
    TGT: "0.03"
  terminal_multiple: "20"
  holding_period_years: 7
  base_growth_rate: "0.03"
  synergy_growth_rate: "0.05"
"#;
        let config: DealConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.assumptions.holding_period_years, 7);
        assert_eq!(config.estimation.capex_pct.to_string(), "0.09");
    }
}
