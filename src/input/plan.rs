//! Code for reading power development plans.
use super::{
    MissingYears, input_err_msg, read_category_values, read_series, read_toml, read_year_table,
    read_year_table_optional,
};
use crate::plan::Plan;
use crate::source::{Source, capacity_sources, fuels};
use crate::table::{CategoryValues, Series, YearTable};
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const PLAN_FILE_NAME: &str = "plan.toml";
const ADDITIONS_FILE_NAME: &str = "additions.csv";
const RETIREMENT_FILE_NAME: &str = "retirement.csv";
const CAPACITY_FACTOR_FILE_NAME: &str = "capacity_factor.csv";
const NET_IMPORT_FILE_NAME: &str = "net_import.csv";
const OPENING_CAPACITY_FILE_NAME: &str = "opening_capacity.csv";

/// Represents the contents of `plan.toml`
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    /// Human-readable description, defaulting to the name of the plan's folder
    description: Option<String>,
}

/// Fill in zero columns for capacity categories absent from a table of capacity changes
fn complete_capacity_table(table: YearTable, file_path: &Path) -> Result<YearTable> {
    ensure!(
        !table.contains(Source::Import),
        "{}: {} has no capacity",
        input_err_msg(file_path),
        Source::Import
    );

    Ok(table.select_or_zero(capacity_sources()))
}

/// Read a plan from its folder.
///
/// Only `additions.csv` and `capacity_factor.csv` are required. Years and categories absent from
/// the capacity tables are zero; so are net imports if `net_import.csv` is absent.
///
/// # Arguments
///
/// * `plans_dir` - Folder containing one folder per plan
/// * `name` - Name of the plan's folder
/// * `axis` - The model horizon
pub fn read_plan(plans_dir: &Path, name: &str, axis: YearAxis) -> Result<Plan> {
    let plan_dir = plans_dir.join(name);
    read_plan_from_dir(&plan_dir, name, axis).with_context(|| format!("Failed to read plan {name}"))
}

fn read_plan_from_dir(plan_dir: &Path, name: &str, axis: YearAxis) -> Result<Plan> {
    ensure!(plan_dir.is_dir(), "Plan folder {} not found", plan_dir.display());

    let plan_file_path = plan_dir.join(PLAN_FILE_NAME);
    let plan_file: PlanFile = if plan_file_path.exists() {
        read_toml(&plan_file_path)?
    } else {
        PlanFile::default()
    };
    let description = plan_file.description.unwrap_or_else(|| name.to_string());

    let additions_path = plan_dir.join(ADDITIONS_FILE_NAME);
    let additions = complete_capacity_table(
        read_year_table(&additions_path, axis, MissingYears::Zero)?,
        &additions_path,
    )?;
    let retirement_path = plan_dir.join(RETIREMENT_FILE_NAME);
    let retirement = complete_capacity_table(
        read_year_table_optional(&retirement_path, axis, fuels())?,
        &retirement_path,
    )?;
    let capacity_factor = read_year_table(
        &plan_dir.join(CAPACITY_FACTOR_FILE_NAME),
        axis,
        MissingYears::Zero,
    )?;

    let net_import_path = plan_dir.join(NET_IMPORT_FILE_NAME);
    let net_import = if net_import_path.exists() {
        read_series(&net_import_path, axis, MissingYears::Zero)?
    } else {
        Series::zeros(axis)
    };

    let opening_path = plan_dir.join(OPENING_CAPACITY_FILE_NAME);
    let opening_capacity = if opening_path.exists() {
        read_category_values(&opening_path)?
    } else {
        CategoryValues::default()
    };

    Plan::new(
        &description,
        axis,
        &additions,
        &retirement,
        &capacity_factor,
        &net_import,
        &opening_capacity,
    )
}
