//! Code for working with the year axis of the model.
use crate::input::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// The first year of the default model horizon
pub const DEFAULT_START_YEAR: u32 = 2016;

/// The last year of the default model horizon
pub const DEFAULT_END_YEAR: u32 = 2050;

/// An ordered, contiguous range of years to which every time series in a model is aligned.
///
/// Index 0 corresponds to `start`, which is also the base year for discounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearAxis {
    start: u32,
    end: u32,
}

impl YearAxis {
    /// Create a new [`YearAxis`] covering `start..=end`
    pub fn new(start: u32, end: u32) -> Result<Self> {
        ensure!(
            start <= end,
            "Start year ({start}) must not be after end year ({end})"
        );

        Ok(Self { start, end })
    }

    /// The first year of the axis
    pub fn start(&self) -> u32 {
        self.start
    }

    /// The last year of the axis
    pub fn end(&self) -> u32 {
        self.end
    }

    /// The number of years covered
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Always false: an axis covers at least one year
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the years in order
    pub fn years(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Whether `year` lies on the axis
    pub fn contains(&self, year: u32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// The position of `year` on the axis
    pub fn index_of(&self, year: u32) -> Result<usize> {
        ensure!(self.contains(year), "Year {year} is outside the model horizon {self}");
        Ok((year - self.start) as usize)
    }

    /// The year at position `index`
    pub fn year_at(&self, index: usize) -> Option<u32> {
        let offset = u32::try_from(index).ok()?;
        let year = self.start.checked_add(offset)?;
        (year <= self.end).then_some(year)
    }

    /// The years `[from, end]`, which must lie on the axis
    pub fn years_from(&self, from: u32) -> Result<RangeInclusive<u32>> {
        self.index_of(from)
            .with_context(|| format!("Invalid start of period: {from}"))?;
        Ok(from..=self.end)
    }

    /// Keep only the given years which lie on the axis, in order and without duplicates.
    ///
    /// Reports are defined in terms of fixed key years (e.g. 2030), which may not all be present
    /// on a shortened axis.
    pub fn filter_years<I>(&self, years: I) -> Vec<u32>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut years: Vec<_> = years.into_iter().filter(|y| self.contains(*y)).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

impl Default for YearAxis {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: DEFAULT_END_YEAR,
        }
    }
}

impl fmt::Display for YearAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse a single year and check it lies on `axis`
fn parse_and_validate_year(s: &str, axis: YearAxis) -> Option<u32> {
    let year = s.trim().parse::<u32>().ok()?;
    axis.contains(year).then_some(year)
}

/// Parse a string describing which years of `axis` an input row applies to.
///
/// The string can be "all" (case-insensitive), a single year, a semicolon-separated list of years
/// (e.g. "2020;2025;2030") or a range of the form `start..end`, `start..` or `..end`. Open ends of a
/// range default to the ends of the axis.
pub fn parse_year_str(s: &str, axis: YearAxis) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(axis.years().collect());
    }

    ensure!(
        !(s.contains(';') && s.contains("..")),
        "Both ';' and '..' found in year string {s}. Discrete years and ranges cannot be mixed."
    );

    let years: Vec<_> = if s.contains("..") {
        parse_years_range(s, axis)?
    } else {
        s.split(';')
            .map(|y| {
                parse_and_validate_year(y, axis).with_context(|| format!("Invalid year: {y}"))
            })
            .try_collect()?
    };

    ensure!(
        is_sorted_and_unique(&years),
        "Years must be in order and unique"
    );

    Ok(years)
}

/// Parse a year range, keeping the years which lie on `axis`
fn parse_years_range(s: &str, axis: YearAxis) -> Result<Vec<u32>> {
    let (left, right) = s
        .split_once("..")
        .with_context(|| format!("Invalid year range: {s}"))?;
    ensure!(
        !right.contains(".."),
        "Year range must be of the form 'start..end', 'start..' or '..end'. Invalid: {s}"
    );
    let (left, right) = (left.trim(), right.trim());

    let start = if left.is_empty() {
        axis.start()
    } else {
        left.parse::<u32>()
            .ok()
            .with_context(|| format!("Invalid start year in range: {left}"))?
    };
    let end = if right.is_empty() {
        axis.end()
    } else {
        right
            .parse::<u32>()
            .ok()
            .with_context(|| format!("Invalid end year in range: {right}"))?
    };

    ensure!(
        end > start,
        "End year must be bigger than start year in range {s}"
    );
    let years: Vec<_> = (start..=end).filter(|y| axis.contains(*y)).collect();
    ensure!(
        !years.is_empty(),
        "No valid years found in year range string {s}"
    );

    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[test]
    fn test_default_axis() {
        let axis = YearAxis::default();
        assert_eq!(axis.len(), 35);
        assert_eq!(axis.years().next(), Some(2016));
        assert_eq!(axis.years().last(), Some(2050));
    }

    #[test]
    fn test_new_invalid() {
        assert_error!(
            YearAxis::new(2050, 2016),
            "Start year (2050) must not be after end year (2016)"
        );
    }

    #[rstest]
    #[case(2016, Some(0))]
    #[case(2020, Some(4))]
    #[case(2050, Some(34))]
    #[case(2015, None)]
    #[case(2051, None)]
    fn test_index_of(#[case] year: u32, #[case] expected: Option<usize>) {
        let axis = YearAxis::default();
        assert_eq!(axis.index_of(year).ok(), expected);
    }

    #[test]
    fn test_year_at() {
        let axis = YearAxis::new(2020, 2022).unwrap();
        assert_eq!(axis.year_at(2), Some(2022));
        assert_eq!(axis.year_at(3), None);
    }

    #[test]
    fn test_filter_years() {
        let axis = YearAxis::new(2016, 2040).unwrap();
        assert_eq!(
            axis.filter_years([2030, 2016, 2050, 2030, 2040]),
            [2016, 2030, 2040]
        );
    }

    #[test]
    fn test_years_from() {
        let axis = YearAxis::new(2016, 2020).unwrap();
        assert!(axis.years_from(2018).unwrap().eq(2018..=2020));
        assert!(axis.years_from(2021).is_err());
    }

    #[rstest]
    #[case("all", vec![2016, 2017, 2018, 2019, 2020])]
    #[case("ALL", vec![2016, 2017, 2018, 2019, 2020])]
    #[case("2018", vec![2018])]
    #[case("2016; 2020", vec![2016, 2020])]
    #[case("2018..", vec![2018, 2019, 2020])]
    #[case("..2017", vec![2016, 2017])]
    #[case("2010..2017", vec![2016, 2017])]
    fn test_parse_year_str_valid(#[case] s: &str, #[case] expected: Vec<u32>) {
        let axis = YearAxis::new(2016, 2020).unwrap();
        assert_eq!(parse_year_str(s, axis).unwrap(), expected);
    }

    #[rstest]
    #[case("", "No years provided")]
    #[case("2021", "Invalid year: 2021")]
    #[case("2018;2017", "Years must be in order and unique")]
    #[case("2017;2017", "Years must be in order and unique")]
    #[case("2018..2017", "End year must be bigger than start year in range 2018..2017")]
    #[case("2030..2040", "No valid years found in year range string 2030..2040")]
    #[case(
        "2017;2018..2019",
        "Both ';' and '..' found in year string 2017;2018..2019. Discrete years and ranges cannot be \
        mixed."
    )]
    fn test_parse_year_str_invalid(#[case] s: &str, #[case] msg: &str) {
        let axis = YearAxis::new(2016, 2020).unwrap();
        assert_error!(parse_year_str(s, axis), msg);
    }
}
