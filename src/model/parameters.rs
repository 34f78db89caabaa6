//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::finance::check_discount_rate;
use crate::input::{input_err_msg, is_sorted_and_unique, read_toml};
use crate::plan::{CcsRetrofit, default_milestones};
use crate::units::Dimensionless;
use crate::year::{DEFAULT_END_YEAR, DEFAULT_START_YEAR, YearAxis};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_description, String, "Reference parameters".into());
define_param_default!(default_start_year, u32, DEFAULT_START_YEAR);
define_param_default!(default_end_year, u32, DEFAULT_END_YEAR);
define_param_default!(default_bau_label, String, "Baseline".into());
define_param_default!(default_alt_label, String, "Alternative".into());

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Description of the reference parameters
    #[serde(default = "default_description")]
    pub description: String,
    /// First year of the horizon
    #[serde(default = "default_start_year")]
    pub start_year: u32,
    /// Last year of the horizon (inclusive)
    #[serde(default = "default_end_year")]
    pub end_year: u32,
    /// Rate used to discount costs and production to the start year
    pub discount_rate: Dimensionless,
    /// Years shown in summaries. Defaults to the ends of the horizon and a few key years.
    #[serde(default)]
    pub milestone_years: Option<Vec<u32>>,
    /// Name of the baseline plan, a folder in `plans`
    pub bau_plan: String,
    /// Name of the alternative plan, a folder in `plans`
    #[serde(default)]
    pub alt_plan: Option<String>,
    /// Build the alternative by fitting CCS to the baseline plan instead of reading it
    #[serde(default)]
    pub ccs_retrofit: Option<CcsRetrofit>,
    /// Column header for the baseline in reports
    #[serde(default = "default_bau_label")]
    pub bau_label: String,
    /// Column header for the alternative in reports
    #[serde(default = "default_alt_label")]
    pub alt_label: String,
}

/// Check that the milestone years are sorted, unique and within the horizon
fn check_milestone_years(years: &[u32], axis: YearAxis) -> Result<()> {
    ensure!(!years.is_empty(), "`milestone_years` is empty");
    ensure!(
        is_sorted_and_unique(years),
        "`milestone_years` must be composed of unique values in order"
    );
    for &year in years {
        ensure!(
            axis.contains(year),
            "Milestone year {year} is outside the horizon {}-{}",
            axis.start(),
            axis.end()
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// The horizon of the model
    pub fn axis(&self) -> Result<YearAxis> {
        YearAxis::new(self.start_year, self.end_year)
    }

    /// The years shown in summaries
    pub fn milestones(&self) -> Result<Vec<u32>> {
        let axis = self.axis()?;
        Ok(self
            .milestone_years
            .clone()
            .unwrap_or_else(|| default_milestones(axis)))
    }

    /// The report column headers for the baseline, the alternative and their difference
    pub fn headers(&self) -> [&str; 3] {
        [self.bau_label.as_str(), self.alt_label.as_str(), "difference"]
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        let axis = self.axis().context("Invalid horizon")?;

        if let Some(years) = &self.milestone_years {
            check_milestone_years(years, axis)?;
        }

        check_discount_rate(self.discount_rate)?;

        ensure!(
            self.alt_plan.is_some() != self.ccs_retrofit.is_some(),
            "Exactly one of alt_plan and ccs_retrofit must be given"
        );
        if let Some(retrofit) = &self.ccs_retrofit {
            retrofit.validate(axis).context("Invalid ccs_retrofit")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn parse(toml: &str) -> ModelParameters {
        toml::from_str(toml).unwrap()
    }

    #[rstest]
    #[case(&[2016], true)]
    #[case(&[2016, 2050], true)]
    #[case(&[], false)]
    #[case(&[2020, 2020], false)]
    #[case(&[2030, 2020], false)]
    #[case(&[2015, 2020], false)]
    #[case(&[2020, 2051], false)]
    fn test_check_milestone_years(#[case] years: &[u32], #[case] valid: bool) {
        let axis = YearAxis::new(2016, 2050).unwrap();
        assert_eq!(check_milestone_years(years, axis).is_ok(), valid);
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "discount_rate = 0.06\nbau_plan = \"baseline\"\nalt_plan = \"renewables\""
            )
            .unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params.discount_rate, Dimensionless(0.06));
        assert_eq!(model_params.bau_plan, "baseline");
        assert_eq!(model_params.alt_plan.as_deref(), Some("renewables"));
        assert_eq!(model_params.description, "Reference parameters");
        assert_eq!(model_params.axis().unwrap(), YearAxis::new(2016, 2050).unwrap());
        assert_eq!(
            model_params.milestones().unwrap(),
            [2016, 2020, 2025, 2030, 2040, 2050]
        );
        assert_eq!(
            model_params.headers(),
            ["Baseline", "Alternative", "difference"]
        );
    }

    #[test]
    fn test_ccs_retrofit_defaults() {
        let model_params = parse(
            "discount_rate = 0.05\n\
            bau_plan = \"baseline\"\n\
            [ccs_retrofit]\n\
            retrofit_start_year = 2040\n",
        );
        model_params.validate().unwrap();
        let retrofit = model_params.ccs_retrofit.unwrap();
        assert_eq!(retrofit.retrofit_start_year, 2040);
        assert_eq!(retrofit.pilots, CcsRetrofit::default().pilots);
    }

    #[rstest]
    #[case(
        "discount_rate = 0.05\nbau_plan = \"a\"",
        "Exactly one of alt_plan and ccs_retrofit must be given"
    )]
    #[case(
        "discount_rate = 0.05\nbau_plan = \"a\"\nalt_plan = \"b\"\n[ccs_retrofit]",
        "Exactly one of alt_plan and ccs_retrofit must be given"
    )]
    #[case(
        "discount_rate = -1.5\nbau_plan = \"a\"\nalt_plan = \"b\"",
        "Discount rate must be a finite number greater than -1 (got -1.5)"
    )]
    #[case(
        "discount_rate = 0.05\nbau_plan = \"a\"\nalt_plan = \"b\"\nmilestone_years = [2060]",
        "Milestone year 2060 is outside the horizon 2016-2050"
    )]
    #[case(
        "start_year = 2030\nend_year = 2020\ndiscount_rate = 0.05\nbau_plan = \"a\"\nalt_plan = \"b\"",
        "Invalid horizon"
    )]
    fn test_validate_invalid(#[case] toml: &str, #[case] msg: &str) {
        assert_error!(parse(toml).validate(), msg);
    }

    #[test]
    fn test_unknown_field() {
        assert!(
            toml::from_str::<ModelParameters>(
                "discount_rate = 0.05\nbau_plan = \"a\"\ncolour = \"green\""
            )
            .is_err()
        );
    }
}
