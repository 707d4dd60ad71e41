use clap::Args;
use serde_json::Value;

use deal_model_core::scenarios::break_even::{self, BreakEvenInput};
use deal_model_core::scenarios::sensitivity::{self, IrrSensitivityInput};
use deal_model_core::scenarios::sweep::{self, SweepInput};

use crate::input;

/// Arguments for a synergy scenario sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Path to SweepInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sweep_input: SweepInput = input::read_input(args.input.as_deref(), "scenario sweep")?;
    let result = sweep::sweep(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a break-even search
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to BreakEvenInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_break_even(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let be_input: BreakEvenInput = input::read_input(args.input.as_deref(), "break-even")?;
    let result = break_even::find_break_even(&be_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a two-way IRR sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to IrrSensitivityInput file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid_input: IrrSensitivityInput =
        input::read_input(args.input.as_deref(), "sensitivity")?;
    let result = sensitivity::irr_sensitivity(&grid_input)?;
    Ok(serde_json::to_value(result)?)
}
