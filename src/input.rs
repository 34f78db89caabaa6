//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use crate::parameter::Parameter;
use crate::salvage::PlantLifeMap;
use crate::source::Source;
use crate::table::{CategoryValues, Series, YearTable};
use crate::year::{YearAxis, parse_year_str};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub mod parameter;
use parameter::read_parameter_inputs;
pub mod plan;
use plan::read_plan;

/// The folder in a model directory containing the parameter files
const PARAMETERS_DIR_NAME: &str = "parameters";

/// The folder in a model directory containing one folder per plan
const PLANS_DIR_NAME: &str = "plans";

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// Returns an empty iterator if the file does not exist.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Indicates whether the elements of an iterator are sorted with no duplicates
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}

/// A row of a year × category CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct YearTableRaw {
    category: Source,
    years: String,
    value: f64,
}

/// A row of a year-indexed CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct SeriesRaw {
    years: String,
    value: f64,
}

/// A row of a per-category CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct CategoryValueRaw {
    category: Source,
    value: f64,
}

/// A row of the plant accounting life CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct PlantLifeRaw {
    category: Source,
    life: u32,
}

/// Whether years missing from a year-indexed file are an error or zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingYears {
    /// Every category given must have a value for every year
    Error,
    /// Years without a value are zero
    Zero,
}

/// Place the values of an input row into the years it applies to
fn fill_years(
    values: &mut [Option<f64>],
    axis: YearAxis,
    years: &str,
    value: f64,
    what: &str,
) -> Result<()> {
    ensure!(value.is_finite(), "Invalid value for {what}: {value}");
    for year in parse_year_str(years, axis)? {
        let slot = &mut values[axis.index_of(year)?];
        ensure!(slot.is_none(), "Duplicate entry for {what} in {year}");
        *slot = Some(value);
    }

    Ok(())
}

/// Resolve the years without a value
fn complete_years(
    values: Vec<Option<f64>>,
    axis: YearAxis,
    missing: MissingYears,
    what: &str,
) -> Result<Vec<f64>> {
    axis.years()
        .zip(values)
        .map(|(year, value)| -> Result<f64> {
            match (value, missing) {
                (Some(value), _) => Ok(value),
                (None, MissingYears::Zero) => Ok(0.0),
                (None, MissingYears::Error) => bail!("Missing value for {what} in {year}"),
            }
        })
        .try_collect()
}

/// Read a year × category table from a CSV file with `category`, `years` and `value` columns.
///
/// Categories which do not appear in the file have no column in the table.
pub fn read_year_table(file_path: &Path, axis: YearAxis, missing: MissingYears) -> Result<YearTable> {
    let iter = read_csv(file_path)?;
    read_year_table_from_iter(iter, axis, missing).with_context(|| input_err_msg(file_path))
}

/// Read a year × category table from a CSV file, which may be absent (giving a table of zeros)
pub fn read_year_table_optional<I>(
    file_path: &Path,
    axis: YearAxis,
    default_categories: I,
) -> Result<YearTable>
where
    I: IntoIterator<Item = Source>,
{
    if !file_path.exists() {
        return Ok(YearTable::zeros(axis, default_categories));
    }

    read_year_table(file_path, axis, MissingYears::Zero)
}

fn read_year_table_from_iter<I>(iter: I, axis: YearAxis, missing: MissingYears) -> Result<YearTable>
where
    I: Iterator<Item = YearTableRaw>,
{
    let mut columns: IndexMap<Source, Vec<Option<f64>>> = IndexMap::new();
    for record in iter {
        let values = columns
            .entry(record.category)
            .or_insert_with(|| vec![None; axis.len()]);
        fill_years(
            values,
            axis,
            &record.years,
            record.value,
            &record.category.to_string(),
        )?;
    }

    let columns: Vec<_> = columns
        .into_iter()
        .map(|(category, values)| -> Result<_> {
            Ok((
                category,
                complete_years(values, axis, missing, &category.to_string())?,
            ))
        })
        .try_collect()?;

    YearTable::new(axis, columns)
}

/// Read a year-indexed series from a CSV file with `years` and `value` columns
pub fn read_series(file_path: &Path, axis: YearAxis, missing: MissingYears) -> Result<Series> {
    let iter = read_csv(file_path)?;
    read_series_from_iter(iter, axis, missing).with_context(|| input_err_msg(file_path))
}

fn read_series_from_iter<I>(iter: I, axis: YearAxis, missing: MissingYears) -> Result<Series>
where
    I: Iterator<Item = SeriesRaw>,
{
    let mut values = vec![None; axis.len()];
    for record in iter {
        fill_years(&mut values, axis, &record.years, record.value, "series")?;
    }

    Series::new(axis, complete_years(values, axis, missing, "series")?)
}

/// Read one value per category from a CSV file with `category` and `value` columns
pub fn read_category_values(file_path: &Path) -> Result<CategoryValues> {
    let iter = read_csv(file_path)?;
    read_category_values_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_category_values_from_iter<I>(iter: I) -> Result<CategoryValues>
where
    I: Iterator<Item = CategoryValueRaw>,
{
    let mut map = IndexMap::new();
    for record in iter {
        ensure!(
            record.value.is_finite(),
            "Invalid value for {}: {}",
            record.category,
            record.value
        );
        ensure!(
            map.insert(record.category, record.value).is_none(),
            "Duplicate entry for {}",
            record.category
        );
    }

    Ok(map.into_iter().collect())
}

/// Read plant accounting lives from a CSV file with `category` and `life` columns
pub fn read_plant_life(file_path: &Path) -> Result<PlantLifeMap> {
    let iter = read_csv(file_path)?;
    read_plant_life_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_plant_life_from_iter<I>(iter: I) -> Result<PlantLifeMap>
where
    I: Iterator<Item = PlantLifeRaw>,
{
    let mut map = PlantLifeMap::new();
    for record in iter {
        ensure!(
            map.insert(record.category, record.life).is_none(),
            "Duplicate entry for {}",
            record.category
        );
    }

    Ok(map)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The reference parameters and the two plans to compare, or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let model_parameters = ModelParameters::from_path(model_dir)?;
    let axis = model_parameters.axis()?;

    let parameter_inputs = read_parameter_inputs(
        &model_dir.join(PARAMETERS_DIR_NAME),
        axis,
        &model_parameters,
    )?;
    let reference = Parameter::new(parameter_inputs).context("Invalid parameters")?;
    info!("Loaded {reference}");

    let plans_dir = model_dir.join(PLANS_DIR_NAME);
    let bau = read_plan(&plans_dir, &model_parameters.bau_plan, axis)?;
    let alt = match (&model_parameters.alt_plan, &model_parameters.ccs_retrofit) {
        (Some(name), None) => read_plan(&plans_dir, name, axis)?,
        (None, Some(retrofit)) => retrofit
            .apply(&bau)
            .context("Failed to build the CCS plan")?,
        _ => bail!("Exactly one of alt_plan and ccs_retrofit must be given"),
    };
    info!("BAU = {bau}");
    info!("ALT = {alt}");

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters: model_parameters,
        reference,
        bau: Arc::new(bau),
        alt: Arc::new(alt),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, axis};
    use rstest::rstest;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        a: u32,
        b: String,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = fs::File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    /// Test a normal read
    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "a,b\n1,hello\n2,world\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    a: 1,
                    b: "hello".to_string()
                },
                Record {
                    a: 2,
                    b: "world".to_string()
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "a,b\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );

        // Missing file
        let file_path = dir.path().join("nonexistent.csv");
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = fs::File::create(&file_path).unwrap();
            writeln!(file, "value = 1").unwrap();
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct Value {
            value: u32,
        }

        assert_eq!(
            read_toml::<Value>(&file_path).unwrap(),
            Value { value: 1 }
        );

        // Invalid TOML
        {
            let mut file = fs::File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }
        assert!(read_toml::<Value>(&file_path).is_err());
    }

    #[rstest]
    #[case(&[] as &[u32], true)]
    #[case(&[1], true)]
    #[case(&[1, 2], true)]
    #[case(&[1, 1], false)]
    #[case(&[2, 1], false)]
    fn test_is_sorted_and_unique(#[case] values: &[u32], #[case] expected: bool) {
        assert_eq!(is_sorted_and_unique(values), expected);
    }

    fn raw(category: Source, years: &str, value: f64) -> YearTableRaw {
        YearTableRaw {
            category,
            years: years.into(),
            value,
        }
    }

    #[rstest]
    fn test_read_year_table_from_iter(axis: YearAxis) {
        let records = [
            raw(Source::Gas, "2016..2017", 2.0),
            raw(Source::Coal, "all", 1.0),
            raw(Source::Gas, "2019", 3.0),
        ];
        let table = read_year_table_from_iter(records.into_iter(), axis, MissingYears::Zero).unwrap();

        // Columns in canonical order, whatever the order of the file
        assert_eq!(
            table.categories().collect_vec(),
            [Source::Coal, Source::Gas]
        );
        assert_eq!(table.column(Source::Coal).unwrap(), [1.0; 5]);
        assert_eq!(table.column(Source::Gas).unwrap(), [2.0, 2.0, 0.0, 3.0, 0.0]);
    }

    #[rstest]
    fn test_read_year_table_from_iter_missing(axis: YearAxis) {
        let records = [raw(Source::Gas, "2016..2019", 2.0)];
        assert_error!(
            read_year_table_from_iter(records.into_iter(), axis, MissingYears::Error),
            "Missing value for Gas in 2020"
        );
    }

    #[rstest]
    fn test_read_year_table_from_iter_duplicate(axis: YearAxis) {
        let records = [raw(Source::Gas, "all", 2.0), raw(Source::Gas, "2018", 1.0)];
        assert_error!(
            read_year_table_from_iter(records.into_iter(), axis, MissingYears::Zero),
            "Duplicate entry for Gas in 2018"
        );
    }

    #[rstest]
    fn test_read_year_table_from_iter_non_finite(axis: YearAxis) {
        let records = [raw(Source::Gas, "all", f64::NAN)];
        assert_error!(
            read_year_table_from_iter(records.into_iter(), axis, MissingYears::Zero),
            "Invalid value for Gas: NaN"
        );
    }

    #[rstest]
    fn test_read_year_table_file(axis: YearAxis) {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(
            dir.path(),
            "category,years,value\ncoal,all,5\nSOLAR,2018;2020,1.5",
        );
        let table = read_year_table(&file_path, axis, MissingYears::Zero).unwrap();
        assert_eq!(table.get(2017, Source::Coal).unwrap(), 5.0);
        assert_eq!(table.get(2020, Source::Solar).unwrap(), 1.5);
        assert_eq!(table.get(2019, Source::Solar).unwrap(), 0.0);

        // Absent optional file
        let table =
            read_year_table_optional(&dir.path().join("none.csv"), axis, [Source::Coal]).unwrap();
        assert_eq!(table.column(Source::Coal).unwrap(), [0.0; 5]);
    }

    #[rstest]
    fn test_read_series_from_iter(axis: YearAxis) {
        let records = [
            SeriesRaw {
                years: "..2018".into(),
                value: 1.0,
            },
            SeriesRaw {
                years: "2019..".into(),
                value: 2.0,
            },
        ];
        let series = read_series_from_iter(records.into_iter(), axis, MissingYears::Error).unwrap();
        assert_eq!(series.values(), [1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_read_category_values_from_iter() {
        let records = [
            CategoryValueRaw {
                category: Source::Coal,
                value: 900.0,
            },
            CategoryValueRaw {
                category: Source::Coal,
                value: 800.0,
            },
        ];
        assert_error!(
            read_category_values_from_iter(records.into_iter()),
            "Duplicate entry for Coal"
        );
    }

    #[test]
    fn test_read_plant_life_from_iter() {
        let records = [
            PlantLifeRaw {
                category: Source::Coal,
                life: 40,
            },
            PlantLifeRaw {
                category: Source::Gas,
                life: 25,
            },
        ];
        let map = read_plant_life_from_iter(records.into_iter()).unwrap();
        assert_eq!(map[&Source::Coal], 40);
        assert_eq!(map[&Source::Gas], 25);
    }
}
