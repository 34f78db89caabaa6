//! Code for reading the technical and economic parameters of a model.
use super::{
    MissingYears, read_category_values, read_plant_life, read_series, read_year_table,
};
use crate::model::ModelParameters;
use crate::parameter::ParameterInputs;
use crate::table::YearTable;
use crate::year::YearAxis;
use anyhow::Result;
use std::path::Path;

const PLANT_LIFE_FILE_NAME: &str = "plant_accounting_life.csv";
const CONSTRUCTION_COST_FILE_NAME: &str = "construction_cost.csv";
const FIXED_OPERATING_COST_FILE_NAME: &str = "fixed_operating_cost.csv";
const VARIABLE_OPERATING_COST_FILE_NAME: &str = "variable_operating_cost.csv";
const HEAT_RATE_FILE_NAME: &str = "heat_rate.csv";
const HEAT_PRICE_FILE_NAME: &str = "heat_price.csv";
const EMISSION_FACTOR_FILE_NAME: &str = "emission_factor.csv";
const CAPTURE_FACTOR_FILE_NAME: &str = "capture_factor.csv";
const CARBON_PRICE_FILE_NAME: &str = "carbon_price.csv";

/// Read a table which only some sources need.
///
/// An absent file gives a table with no columns, i.e. zero for every source. Sources given in the
/// file must have a value for every year.
fn read_sparse_table(file_path: &Path, axis: YearAxis) -> Result<YearTable> {
    if !file_path.exists() {
        return Ok(YearTable::zeros(axis, std::iter::empty()));
    }

    read_year_table(file_path, axis, MissingYears::Error)
}

/// Read the inputs for the reference [`crate::parameter::Parameter`] from a folder.
///
/// # Arguments
///
/// * `parameters_dir` - Folder containing the parameter CSV files
/// * `axis` - The model horizon
/// * `model_parameters` - Supplies the description and the discount rate
pub fn read_parameter_inputs(
    parameters_dir: &Path,
    axis: YearAxis,
    model_parameters: &ModelParameters,
) -> Result<ParameterInputs> {
    let table = |file_name: &str| {
        read_year_table(&parameters_dir.join(file_name), axis, MissingYears::Error)
    };

    Ok(ParameterInputs {
        description: model_parameters.description.clone(),
        discount_rate: model_parameters.discount_rate,
        plant_accounting_life: read_plant_life(&parameters_dir.join(PLANT_LIFE_FILE_NAME))?,
        construction_cost: table(CONSTRUCTION_COST_FILE_NAME)?,
        fixed_operating_cost: table(FIXED_OPERATING_COST_FILE_NAME)?,
        variable_operating_cost: table(VARIABLE_OPERATING_COST_FILE_NAME)?,
        heat_rate: read_sparse_table(&parameters_dir.join(HEAT_RATE_FILE_NAME), axis)?,
        heat_price: read_sparse_table(&parameters_dir.join(HEAT_PRICE_FILE_NAME), axis)?,
        emission_factor: read_category_values(&parameters_dir.join(EMISSION_FACTOR_FILE_NAME))?,
        capture_factor: read_sparse_table(&parameters_dir.join(CAPTURE_FACTOR_FILE_NAME), axis)?,
        carbon_price: read_series(
            &parameters_dir.join(CARBON_PRICE_FILE_NAME),
            axis,
            MissingYears::Error,
        )?,
    })
}
