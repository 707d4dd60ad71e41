use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use deal_model_core::facts::{FactStore, InMemoryFactStore};
use deal_model_core::ma::deal::{self, DealAnalysisInput};
use deal_model_core::ma::estimation::{self, EstimationPolicy};
use deal_model_core::ma::pro_forma::{self, DealParty};
use deal_model_core::ma::projection::{self, ProjectionInput};
use deal_model_core::ma::synergy_valuation::{self, RevenueSynergyInput};

use crate::config;
use crate::input;

fn load_store(path: &str) -> Result<InMemoryFactStore, Box<dyn std::error::Error>> {
    let store: InMemoryFactStore = input::file::read_document(path)?;
    tracing::debug!(
        path,
        entities = store.financials.len(),
        quotes = store.quotes.len(),
        "fact store loaded"
    );
    Ok(store)
}

fn party<'a>(
    store: &'a InMemoryFactStore,
    id: &'a str,
) -> Result<DealParty<'a>, Box<dyn std::error::Error>> {
    Ok(DealParty {
        id,
        facts: store.require_facts(id)?,
        quote: store.require_quote(id)?,
    })
}

/// Arguments for pro forma consolidation
#[derive(Args)]
pub struct ProFormaArgs {
    /// Fact store snapshot (JSON or YAML)
    #[arg(long)]
    pub facts: String,

    /// Deal configuration (JSON or YAML)
    #[arg(long)]
    pub config: String,

    /// Acquirer entity id
    #[arg(long)]
    pub acquirer: String,

    /// Target entity id
    #[arg(long)]
    pub target: String,

    /// Annual pre-tax synergies
    #[arg(long, default_value = "0")]
    pub synergies: Decimal,
}

pub fn run_pro_forma(args: ProFormaArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let store = load_store(&args.facts)?;
    let config = config::load_config(&args.config)?;
    let result = pro_forma::consolidate(
        party(&store, &args.acquirer)?,
        party(&store, &args.target)?,
        &config.assumptions,
        args.synergies,
    )?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for cash flow estimation
#[derive(Args)]
pub struct EstimateCashFlowArgs {
    /// Fact store snapshot (JSON or YAML)
    #[arg(long)]
    pub facts: String,

    /// Entity id
    #[arg(long)]
    pub entity: String,

    /// Deal configuration; only its estimation policy is used
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_estimate_cash_flow(
    args: EstimateCashFlowArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let store = load_store(&args.facts)?;
    let policy = match args.config {
        Some(ref path) => config::load_config(path)?.estimation,
        None => EstimationPolicy::default(),
    };
    let facts = store.require_facts(&args.entity)?;
    let result =
        estimation::estimate_cash_flows(&args.entity, facts, store.market_quote(&args.entity), &policy)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for cash flow projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to ProjectionInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection_input: ProjectionInput =
        input::read_input(args.input.as_deref(), "projection")?;
    let result = projection::project_cash_flows(&projection_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for revenue synergy valuation
#[derive(Args)]
pub struct SynergyValueArgs {
    /// Path to RevenueSynergyInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_synergy_value(args: SynergyValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let synergy_input: RevenueSynergyInput =
        input::read_input(args.input.as_deref(), "synergy valuation")?;
    let result = synergy_valuation::value_revenue_synergies(&synergy_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for end-to-end deal analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Fact store snapshot (JSON or YAML)
    #[arg(long)]
    pub facts: String,

    /// Deal configuration (JSON or YAML)
    #[arg(long)]
    pub config: String,

    /// Path to DealAnalysisInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let store = load_store(&args.facts)?;
    let config = config::load_config(&args.config)?;
    let analysis_input: DealAnalysisInput =
        input::read_input(args.input.as_deref(), "deal analysis")?;
    let result = deal::analyze_deal(
        &store,
        &config.assumptions,
        &config.estimation,
        &analysis_input,
    )?;
    Ok(serde_json::to_value(result)?)
}
