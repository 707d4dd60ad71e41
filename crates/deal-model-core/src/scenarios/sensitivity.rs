use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealModelError;
use crate::ma::projection::{project, ProjectionInput};
use crate::time_value::{bisect_irr, IrrSearch};
use crate::types::*;
use crate::DealModelResult;

/// A projection input that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrDriver {
    /// Scales `base_synergies`.
    SynergyMultiplier,
    TerminalMultiple,
    BaseGrowthRate,
    SynergyGrowthRate,
    InitialOutlay,
    TaxRate,
}

impl IrrDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrrDriver::SynergyMultiplier => "synergy_multiplier",
            IrrDriver::TerminalMultiple => "terminal_multiple",
            IrrDriver::BaseGrowthRate => "base_growth_rate",
            IrrDriver::SynergyGrowthRate => "synergy_growth_rate",
            IrrDriver::InitialOutlay => "initial_outlay",
            IrrDriver::TaxRate => "tax_rate",
        }
    }

    fn apply(&self, p: &mut ProjectionInput, base_synergies: Money, value: Decimal) {
        match self {
            IrrDriver::SynergyMultiplier => p.annual_synergies = base_synergies * value,
            IrrDriver::TerminalMultiple => p.terminal_multiple = value,
            IrrDriver::BaseGrowthRate => p.base_growth_rate = value,
            IrrDriver::SynergyGrowthRate => p.synergy_growth_rate = value,
            IrrDriver::InitialOutlay => p.initial_outlay = value,
            IrrDriver::TaxRate => p.tax_rate = value,
        }
    }
}

/// One axis of the grid: `min..=max` by `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityAxis {
    pub driver: IrrDriver,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Input for a two-way IRR sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrSensitivityInput {
    /// Base case. Drivers not on an axis keep these values.
    pub projection: ProjectionInput,
    /// Synergies at a multiplier of 1.0; only read by the synergy multiplier driver.
    #[serde(default)]
    pub base_synergies: Money,
    pub rows: SensitivityAxis,
    pub columns: SensitivityAxis,
    #[serde(default)]
    pub irr_search: IrrSearch,
}

/// Output of a two-way IRR sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrSensitivityOutput {
    pub row_driver: IrrDriver,
    pub column_driver: IrrDriver,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Decimal>,
    /// matrix[i][j] = IRR (percentage) at row_values[i], column_values[j].
    /// `None` where the search found no root or the cell was invalid.
    pub matrix: Vec<Vec<Option<Percent>>>,
    /// Cell closest to the midpoint of both ranges
    pub base_case_position: (usize, usize),
    pub base_case_irr: Option<Percent>,
    pub undefined_cells: usize,
}

/// Generate the sweep values for an axis from min to max with step.
fn generate_sweep_values(axis: &SensitivityAxis) -> DealModelResult<Vec<Decimal>> {
    if axis.step <= Decimal::ZERO {
        return Err(DealModelError::InvalidInput {
            field: format!("axis:{}", axis.driver.as_str()),
            reason: "Step must be positive".into(),
        });
    }
    if axis.min > axis.max {
        return Err(DealModelError::InvalidInput {
            field: format!("axis:{}", axis.driver.as_str()),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = axis.min;
    while current <= axis.max {
        values.push(current);
        current += axis.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < axis.max {
            values.push(axis.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Solve the IRR for every combination of two drivers.
///
/// A cell whose inputs are invalid (a tax rate above 1, say) or whose
/// projection compounds past the decimal range is left empty with a warning;
/// it does not abort the grid.
pub fn irr_sensitivity(
    input: &IrrSensitivityInput,
) -> DealModelResult<ComputationOutput<IrrSensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rows.driver == input.columns.driver {
        return Err(DealModelError::InvalidInput {
            field: "columns.driver".into(),
            reason: "Row and column drivers must differ".into(),
        });
    }
    input.irr_search.validate()?;

    let row_values = generate_sweep_values(&input.rows)?;
    let column_values = generate_sweep_values(&input.columns)?;

    let mut matrix = Vec::with_capacity(row_values.len());
    let mut undefined_cells = 0;

    for rv in &row_values {
        let mut row = Vec::with_capacity(column_values.len());
        for cv in &column_values {
            let mut p = input.projection.clone();
            input.rows.driver.apply(&mut p, input.base_synergies, *rv);
            input.columns.driver.apply(&mut p, input.base_synergies, *cv);

            let cell = match p.validate().and_then(|()| project(&p)) {
                Ok(cash_flows) => bisect_irr(&cash_flows, &input.irr_search)?.irr(),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({rv}, {cv}): {e}"));
                    None
                }
            };
            if cell.is_none() {
                undefined_cells += 1;
            }
            row.push(cell);
        }
        matrix.push(row);
    }

    if undefined_cells > 0 {
        warnings.push(format!("{undefined_cells} cell(s) have no IRR in the search range"));
    }

    let mid_row = (input.rows.min + input.rows.max) / dec!(2);
    let mid_col = (input.columns.min + input.columns.max) / dec!(2);
    let base_row = closest_index(&row_values, mid_row);
    let base_col = closest_index(&column_values, mid_col);
    let base_case_irr = matrix[base_row][base_col];

    let output = IrrSensitivityOutput {
        row_driver: input.rows.driver,
        column_driver: input.columns.driver,
        row_values,
        column_values,
        matrix,
        base_case_position: (base_row, base_col),
        base_case_irr,
        undefined_cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way IRR Sensitivity Analysis",
        &serde_json::json!({
            "rows": input.rows.driver.as_str(),
            "columns": input.columns.driver.as_str(),
            "base_synergies": input.base_synergies.to_string(),
            "initial_outlay": input.projection.initial_outlay.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> ProjectionInput {
        ProjectionInput {
            base_annual_cash_flow: dec!(20),
            base_growth_rate: dec!(0.03),
            annual_synergies: dec!(100),
            synergy_growth_rate: dec!(0.05),
            tax_rate: dec!(0.21),
            terminal_ebitda_base: dec!(40),
            terminal_multiple: dec!(15),
            holding_period_years: 5,
            initial_outlay: dec!(1000),
        }
    }

    fn axis(driver: IrrDriver, min: Decimal, max: Decimal, step: Decimal) -> SensitivityAxis {
        SensitivityAxis {
            driver,
            min,
            max,
            step,
        }
    }

    fn grid() -> IrrSensitivityInput {
        IrrSensitivityInput {
            projection: projection(),
            base_synergies: dec!(100),
            rows: axis(IrrDriver::SynergyMultiplier, dec!(0.5), dec!(1.5), dec!(0.25)),
            columns: axis(IrrDriver::TerminalMultiple, dec!(10), dec!(20), dec!(5)),
            irr_search: IrrSearch::default(),
        }
    }

    #[test]
    fn test_grid_dimensions() {
        let result = irr_sensitivity(&grid()).unwrap();
        let out = &result.result;

        assert_eq!(out.row_values.len(), 5); // 0.5, 0.75, 1.0, 1.25, 1.5
        assert_eq!(out.column_values.len(), 3); // 10, 15, 20
        assert_eq!(out.matrix.len(), 5);
        assert_eq!(out.matrix[0].len(), 3);
        assert_eq!(out.base_case_position, (2, 1));
        assert_eq!(out.undefined_cells, 0);
    }

    #[test]
    fn test_base_case_matches_direct_solve() {
        let result = irr_sensitivity(&grid()).unwrap();
        // Row 1.0x synergies, column 15x: exactly the base projection
        let direct = crate::time_value::solve_irr(&project(&projection()).unwrap());
        let diff = result.result.base_case_irr.unwrap() - direct.unwrap();
        assert!(diff.abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_rises_along_both_axes() {
        let result = irr_sensitivity(&grid()).unwrap();
        let m = &result.result.matrix;
        for i in 1..m.len() {
            for j in 0..m[i].len() {
                assert!(m[i][j].unwrap() > m[i - 1][j].unwrap());
            }
        }
        for row in m {
            assert!(row[2].unwrap() > row[0].unwrap());
        }
    }

    #[test]
    fn test_sweep_includes_max() {
        let values = generate_sweep_values(&axis(
            IrrDriver::TaxRate,
            dec!(0.10),
            dec!(0.25),
            dec!(0.10),
        ))
        .unwrap();
        assert_eq!(values, vec![dec!(0.10), dec!(0.20), dec!(0.25)]);
    }

    #[test]
    fn test_invalid_step() {
        let mut input = grid();
        input.rows.step = Decimal::ZERO;
        assert!(irr_sensitivity(&input).is_err());
    }

    #[test]
    fn test_min_above_max() {
        let mut input = grid();
        input.columns.min = dec!(30);
        assert!(irr_sensitivity(&input).is_err());
    }

    #[test]
    fn test_same_driver_twice_rejected() {
        let mut input = grid();
        input.columns = axis(IrrDriver::SynergyMultiplier, dec!(1), dec!(2), dec!(1));
        assert!(irr_sensitivity(&input).is_err());
    }

    #[test]
    fn test_overflowing_cell_is_empty_not_fatal() {
        let mut input = grid();
        input.projection.holding_period_years = 100;
        input.rows = axis(IrrDriver::BaseGrowthRate, dec!(0), dec!(1), dec!(1));
        let result = irr_sensitivity(&input).unwrap();
        let m = &result.result.matrix;

        // 100% growth for 100 years overflows; flat growth does not
        assert!(m[0].iter().all(|cell| cell.is_some()));
        assert!(m[1].iter().all(|cell| cell.is_none()));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Evaluation failed") && w.contains("base_growth_rate")));
    }

    #[test]
    fn test_invalid_cell_is_empty_not_fatal() {
        let mut input = grid();
        input.columns = axis(IrrDriver::TaxRate, dec!(0.5), dec!(1.5), dec!(0.5));
        let result = irr_sensitivity(&input).unwrap();
        // Tax rate 1.5 is invalid in every row
        for row in &result.result.matrix {
            assert!(row[0].is_some());
            assert!(row[2].is_none());
        }
        assert!(result.warnings.iter().any(|w| w.contains("Evaluation failed")));
    }
}
