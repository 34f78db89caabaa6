//! Year-indexed numeric series and year × category tables.
//!
//! Every series carries the [`YearAxis`] it is aligned to. Combining series or tables with
//! different axes is an error, as is looking up a category which a table does not contain
//! (except via the explicit `*_or_zero` methods).
use crate::digest::{Canonical, write_float};
use crate::source::Source;
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::Write;

/// Check that two axes are identical
pub fn check_same_axis(a: YearAxis, b: YearAxis) -> Result<()> {
    ensure!(a == b, "Year axis mismatch: {a} vs {b}");
    Ok(())
}

/// Check that every value is finite
fn check_finite(values: &[f64]) -> Result<()> {
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        anyhow::bail!("Non-finite value {} at position {pos}", values[pos]);
    }

    Ok(())
}

/// One value for each year on an axis
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    axis: YearAxis,
    values: Vec<f64>,
}

impl Series {
    /// Create a new [`Series`], checking that there is one finite value per year
    pub fn new(axis: YearAxis, values: Vec<f64>) -> Result<Self> {
        ensure!(
            values.len() == axis.len(),
            "Expected {} values for years {axis}, got {}",
            axis.len(),
            values.len()
        );
        check_finite(&values)?;

        Ok(Self { axis, values })
    }

    /// A series with the same value in every year
    pub fn constant(axis: YearAxis, value: f64) -> Self {
        Self {
            axis,
            values: vec![value; axis.len()],
        }
    }

    /// A series of zeros
    pub fn zeros(axis: YearAxis) -> Self {
        Self::constant(axis, 0.0)
    }

    /// A series computed from each year
    pub fn from_fn<F>(axis: YearAxis, f: F) -> Self
    where
        F: FnMut(u32) -> f64,
    {
        Self {
            axis,
            values: axis.years().map(f).collect(),
        }
    }

    /// The axis this series is aligned to
    pub fn axis(&self) -> YearAxis {
        self.axis
    }

    /// The values, in year order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value for `year`
    pub fn get(&self, year: u32) -> Result<f64> {
        Ok(self.values[self.axis.index_of(year)?])
    }

    /// Iterate over `(year, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.axis.years().zip(self.values.iter().copied())
    }

    /// The sum of all values
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Apply `f` to every value
    pub fn map<F>(&self, f: F) -> Series
    where
        F: FnMut(f64) -> f64,
    {
        Series {
            axis: self.axis,
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Series {
        self.map(|v| v * factor)
    }

    /// Combine with another series on the same axis, element by element
    pub fn zip_with<F>(&self, other: &Series, mut f: F) -> Result<Series>
    where
        F: FnMut(f64, f64) -> f64,
    {
        check_same_axis(self.axis, other.axis)?;
        Ok(Series {
            axis: self.axis,
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }
}

impl Canonical for Series {
    fn write_canonical(&self, out: &mut String) {
        write!(out, "{}:", self.axis).unwrap();
        for value in &self.values {
            out.push(' ');
            write_float(out, *value);
        }
    }
}

/// One scalar for each category
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryValues(IndexMap<Source, f64>);

impl CategoryValues {
    /// The value for `category`
    pub fn get(&self, category: Source) -> Result<f64> {
        self.0
            .get(&category)
            .copied()
            .with_context(|| format!("No value for {category}"))
    }

    /// The value for `category`, or zero if absent
    pub fn get_or_zero(&self, category: Source) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Whether there is a value for `category`
    pub fn contains(&self, category: Source) -> bool {
        self.0.contains_key(&category)
    }

    /// Iterate over `(category, value)` pairs in canonical category order
    pub fn iter(&self) -> impl Iterator<Item = (Source, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    /// The sum across categories
    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    /// Check that every value is finite
    pub fn check_finite(&self) -> Result<()> {
        for (category, value) in self.iter() {
            ensure!(value.is_finite(), "Non-finite value {value} for {category}");
        }

        Ok(())
    }
}

impl FromIterator<(Source, f64)> for CategoryValues {
    fn from_iter<I: IntoIterator<Item = (Source, f64)>>(iter: I) -> Self {
        let mut map: IndexMap<_, _> = iter.into_iter().collect();
        map.sort_keys();
        Self(map)
    }
}

impl Canonical for CategoryValues {
    fn write_canonical(&self, out: &mut String) {
        for (category, value) in self.iter() {
            write!(out, "{category}=").unwrap();
            write_float(out, value);
            out.push(';');
        }
    }
}

/// A year × category table.
///
/// Columns are kept in canonical category order, whatever order they were supplied in.
#[derive(Debug, Clone, PartialEq)]
pub struct YearTable {
    axis: YearAxis,
    columns: IndexMap<Source, Vec<f64>>,
}

impl YearTable {
    /// Create a new [`YearTable`].
    ///
    /// Each column must have one finite value for every year on the axis and no category may be
    /// given more than once.
    pub fn new<I>(axis: YearAxis, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Source, Vec<f64>)>,
    {
        let mut map = IndexMap::new();
        for (category, values) in columns {
            ensure!(
                values.len() == axis.len(),
                "Column {category}: expected {} values for years {axis}, got {}",
                axis.len(),
                values.len()
            );
            check_finite(&values).with_context(|| format!("Invalid value in column {category}"))?;
            ensure!(
                map.insert(category, values).is_none(),
                "Column {category} given more than once"
            );
        }
        map.sort_keys();

        Ok(Self { axis, columns: map })
    }

    /// A table of zeros with the given columns
    pub fn zeros<I>(axis: YearAxis, categories: I) -> Self
    where
        I: IntoIterator<Item = Source>,
    {
        Self::from_columns(
            axis,
            categories
                .into_iter()
                .map(|c| (c, vec![0.0; axis.len()])),
        )
    }

    /// A table in which each column holds the same value in every year
    pub fn constant_columns(axis: YearAxis, values: &CategoryValues) -> Self {
        Self::from_columns(
            axis,
            values.iter().map(|(c, v)| (c, vec![v; axis.len()])),
        )
    }

    /// Build a table from columns already known to be valid
    fn from_columns<I>(axis: YearAxis, columns: I) -> Self
    where
        I: IntoIterator<Item = (Source, Vec<f64>)>,
    {
        let mut columns: IndexMap<_, _> = columns.into_iter().collect();
        columns.sort_keys();
        Self { axis, columns }
    }

    /// The axis this table is aligned to
    pub fn axis(&self) -> YearAxis {
        self.axis
    }

    /// The categories present, in canonical order
    pub fn categories(&self) -> impl Iterator<Item = Source> + '_ {
        self.columns.keys().copied()
    }

    /// Whether the table has a column for `category`
    pub fn contains(&self, category: Source) -> bool {
        self.columns.contains_key(&category)
    }

    /// Iterate over `(category, values)` pairs
    pub fn iter_columns(&self) -> impl Iterator<Item = (Source, &[f64])> {
        self.columns.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// The values for `category`, in year order
    pub fn column(&self, category: Source) -> Result<&[f64]> {
        self.columns
            .get(&category)
            .map(Vec::as_slice)
            .with_context(|| format!("Missing column for {category}"))
    }

    /// The column for `category` as a [`Series`]
    pub fn column_series(&self, category: Source) -> Result<Series> {
        Ok(Series {
            axis: self.axis,
            values: self.column(category)?.to_vec(),
        })
    }

    /// The column for `category` as a [`Series`], or zeros if absent
    pub fn column_or_zero(&self, category: Source) -> Series {
        self.column_series(category)
            .unwrap_or_else(|_| Series::zeros(self.axis))
    }

    /// The value for `category` in `year`
    pub fn get(&self, year: u32, category: Source) -> Result<f64> {
        let index = self.axis.index_of(year)?;
        Ok(self.column(category)?[index])
    }

    /// Check that the table has a column for every given category
    pub fn require<I>(&self, categories: I) -> Result<()>
    where
        I: IntoIterator<Item = Source>,
    {
        for category in categories {
            self.column(category)?;
        }

        Ok(())
    }

    /// A copy of this table with the column for `category` added or replaced
    pub fn with_column(&self, category: Source, values: &Series) -> Result<Self> {
        check_same_axis(self.axis, values.axis)?;
        let mut table = self.clone();
        table.columns.insert(category, values.values.clone());
        table.columns.sort_keys();
        Ok(table)
    }

    /// Modify the values of one column in place.
    ///
    /// `f` is called with each year and a mutable reference to that year's value. The column is
    /// created (filled with zeros) if it is absent.
    pub fn update_column<F>(&mut self, category: Source, mut f: F)
    where
        F: FnMut(u32, &mut f64),
    {
        let axis = self.axis;
        let column = self
            .columns
            .entry(category)
            .or_insert_with(|| vec![0.0; axis.len()]);
        for (year, value) in axis.years().zip(column.iter_mut()) {
            f(year, value);
        }
        self.columns.sort_keys();
    }

    /// A copy containing only the given categories (all of which must be present)
    pub fn select<I>(&self, categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = Source>,
    {
        let columns: Vec<_> = categories
            .into_iter()
            .map(|c| Ok::<_, anyhow::Error>((c, self.column(c)?.to_vec())))
            .try_collect()?;
        Ok(Self::from_columns(self.axis, columns))
    }

    /// A copy containing the given categories, using zeros for any which are absent
    pub fn select_or_zero<I>(&self, categories: I) -> Self
    where
        I: IntoIterator<Item = Source>,
    {
        Self::from_columns(
            self.axis,
            categories
                .into_iter()
                .map(|c| (c, self.column_or_zero(c).values)),
        )
    }

    /// Apply `f` to every value
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        Self::from_columns(
            self.axis,
            self.columns
                .iter()
                .map(|(c, v)| (*c, v.iter().map(|x| f(*x)).collect())),
        )
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// The running total down each column
    pub fn cumulative_sum(&self) -> Self {
        Self::from_columns(
            self.axis,
            self.columns.iter().map(|(c, v)| {
                let cumsum = v
                    .iter()
                    .scan(0.0, |total, x| {
                        *total += x;
                        Some(*total)
                    })
                    .collect();
                (*c, cumsum)
            }),
        )
    }

    /// Combine each column with the matching column of `other`.
    ///
    /// Every column of `self` must be present in `other` unless `missing_as_zero` is set.
    fn zip_columns<F>(&self, other: &YearTable, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        check_same_axis(self.axis, other.axis)?;
        let columns: Vec<_> = self
            .columns
            .iter()
            .map(|(c, lhs)| {
                let rhs = other
                    .columns
                    .get(c)
                    .with_context(|| format!("Missing column for {c}"))?;
                let values: Vec<f64> = lhs.iter().zip(rhs).map(|(a, b)| f(*a, *b)).collect();
                Ok::<_, anyhow::Error>((*c, values))
            })
            .try_collect()?;
        Ok(Self::from_columns(self.axis, columns))
    }

    /// Element-wise difference; `other` must have every column of `self`
    pub fn sub(&self, other: &YearTable) -> Result<Self> {
        self.zip_columns(other, |a, b| a - b)
    }

    /// Element-wise product; `other` must have every column of `self`
    pub fn mul_table(&self, other: &YearTable) -> Result<Self> {
        self.zip_columns(other, |a, b| a * b)
    }

    /// Multiply each column by the scalar for its category (which must be present)
    pub fn mul_values(&self, values: &CategoryValues) -> Result<Self> {
        let columns: Vec<_> = self
            .columns
            .iter()
            .map(|(c, v)| {
                let factor = values.get(*c)?;
                Ok::<_, anyhow::Error>((*c, v.iter().map(|x| x * factor).collect()))
            })
            .try_collect()?;
        Ok(Self::from_columns(self.axis, columns))
    }

    /// Add a scalar to every value of each column (which must have a value in `values`)
    pub fn add_values(&self, values: &CategoryValues) -> Result<Self> {
        let columns: Vec<_> = self
            .columns
            .iter()
            .map(|(c, v)| {
                let offset = values.get(*c)?;
                Ok::<_, anyhow::Error>((*c, v.iter().map(|x| x + offset).collect()))
            })
            .try_collect()?;
        Ok(Self::from_columns(self.axis, columns))
    }

    /// The sum across all columns for each year
    pub fn row_sum(&self) -> Series {
        let mut values = vec![0.0; self.axis.len()];
        for column in self.columns.values() {
            for (total, x) in values.iter_mut().zip(column) {
                *total += x;
            }
        }

        Series {
            axis: self.axis,
            values,
        }
    }

    /// The sum down each column
    pub fn column_sums(&self) -> CategoryValues {
        self.columns
            .iter()
            .map(|(c, v)| (*c, v.iter().sum()))
            .collect()
    }

    /// Iterate over every `(year, category, value)` entry, column by column
    pub fn iter_entries(&self) -> impl Iterator<Item = (u32, Source, f64)> + '_ {
        self.columns.iter().flat_map(move |(c, v)| {
            self.axis
                .years()
                .zip(v.iter().copied())
                .map(move |(year, value)| (year, *c, value))
        })
    }
}

impl Canonical for YearTable {
    fn write_canonical(&self, out: &mut String) {
        write!(out, "{}", self.axis).unwrap();
        for (category, values) in &self.columns {
            write!(out, "\n{category}:").unwrap();
            for value in values {
                out.push(' ');
                write_float(out, *value);
            }
        }
    }
}
