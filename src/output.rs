//! The module responsible for writing output data to disk.
use crate::pair::RunPair;
use crate::parameter::{CostAttribute, Parameter};
use crate::run::{Metric, Run};
use crate::source::Source;
use crate::table::YearTable;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "powerplan_results";

/// The output file name for the year-by-source tables of each run
const RUN_TABLES_FILE_NAME: &str = "run_tables.csv";

/// The output file name for the headline figures
const TOTALS_FILE_NAME: &str = "totals.csv";

/// The output file name for the sensitivity analysis
const ENSEMBLE_FILE_NAME: &str = "ensemble.csv";

/// The output file name for the parameter tables
const PARAMETERS_FILE_NAME: &str = "debug_parameters.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// A non-empty directory is only replaced if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            // Empty folder, so nothing to overwrite
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Use --overwrite to replace its contents."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// A row of the run tables CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RunTableRow {
    scenario: String,
    signature: String,
    table: String,
    year: u32,
    /// Empty for tables with no breakdown by source
    category: Option<Source>,
    value: f64,
}

/// A row of the totals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TotalsRow {
    metric: String,
    unit: String,
    bau: f64,
    alt: f64,
    difference: f64,
}

/// A row of the ensemble CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EnsembleRow {
    parameters: String,
    digest: String,
    carbon_value: f64,
    total_cost_difference: f64,
    emissions_difference: f64,
}

/// A row of the parameters CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ParameterRow {
    attribute: String,
    year: u32,
    category: Source,
    value: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    parameters_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            parameters_writer: csv::Writer::from_path(output_path.join(PARAMETERS_FILE_NAME))?,
        })
    }

    /// Write the year-by-source tables of `parameter`
    fn write_parameter(&mut self, parameter: &Parameter) -> Result<()> {
        for attribute in CostAttribute::iter() {
            for (year, category, value) in parameter.table(attribute).iter_entries() {
                self.parameters_writer.serialize(ParameterRow {
                    attribute: attribute.to_string(),
                    year,
                    category,
                    value,
                })?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.parameters_writer.flush()?;

        Ok(())
    }
}

/// An object for writing results to file
pub struct DataWriter {
    run_tables_writer: csv::Writer<File>,
    totals_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            run_tables_writer: new_writer(RUN_TABLES_FILE_NAME)?,
            totals_writer: new_writer(TOTALS_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write both runs and the comparison of their headline figures
    pub fn write_pair(&mut self, pair: &RunPair) -> Result<()> {
        self.write_run("bau", pair.bau())?;
        self.write_run("alt", pair.alt())?;
        for row in pair.total().rows() {
            self.totals_writer.serialize(TotalsRow {
                metric: row.key.to_string(),
                unit: row.key.unit().to_string(),
                bau: row.bau,
                alt: row.alt,
                difference: row.difference,
            })?;
        }

        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_parameter(pair.parameter())?;
        }

        Ok(())
    }

    /// Write every year-by-source table of a run
    fn write_run(&mut self, scenario: &str, run: &Run) -> Result<()> {
        let plan = run.plan();
        let tables: [(&str, &YearTable); 10] = [
            ("capacity", plan.capacities()),
            ("production", plan.production()),
            ("investment", run.investment()),
            ("salvage_value", run.salvage_value()),
            ("fixed_om_cost", run.fixed_om_cost()),
            ("variable_om_cost", run.variable_om_cost()),
            ("heat_used", run.heat_used()),
            ("fuel_cost", run.fuel_cost()),
            ("emissions", run.emissions()),
            ("capture", run.capture()),
        ];
        for (name, table) in tables {
            for (year, category, value) in table.iter_entries() {
                self.run_tables_writer.serialize(RunTableRow {
                    scenario: scenario.to_string(),
                    signature: run.signature().to_string(),
                    table: name.to_string(),
                    year,
                    category: Some(category),
                    value,
                })?;
            }
        }

        for (year, value) in run.external_cost().iter() {
            self.run_tables_writer.serialize(RunTableRow {
                scenario: scenario.to_string(),
                signature: run.signature().to_string(),
                table: "external_cost".to_string(),
                year,
                category: None,
                value,
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.run_tables_writer.flush()?;
        self.totals_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Write one row per ensemble member: its carbon value and the differences it derives from
pub fn write_ensemble(output_path: &Path, pairs: &[RunPair]) -> Result<()> {
    let file_path = output_path.join(ENSEMBLE_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Failed to create {}", file_path.display()))?;
    for pair in pairs {
        let difference = pair.alt().total().difference(&pair.bau().total());
        writer.serialize(EnsembleRow {
            parameters: pair.parameter().description().to_string(),
            digest: pair.parameter().digest().to_string(),
            carbon_value: pair.carbon_value(),
            total_cost_difference: difference.get(Metric::TotalCost),
            emissions_difference: difference.get(Metric::Emissions),
        })?;
    }
    writer.flush()?;

    Ok(())
}
