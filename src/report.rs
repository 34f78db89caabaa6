//! Plain-text tables for console reports.
use crate::source::Source;
use crate::table::YearTable;
use anyhow::Result;
use std::fmt;

/// Format a value with a fixed number of decimal places
pub fn format_value(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

/// A table of strings, printed with aligned columns.
///
/// The first column (the row label) is left-aligned; the others are right-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Create an empty table with the given column headers
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Append a column. Rows without a cell for it are left blank.
    pub fn push_column<S, I, T>(&mut self, header: S, cells: I)
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let column = self.header.len();
        self.header.push(header.into());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.resize(column, String::new());
            row.push(cell.into());
        }
    }

    /// The number of rows, not counting the header
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the given years of a table, one row per year
    pub fn from_year_table(
        table: &YearTable,
        categories: &[Source],
        years: &[u32],
        precision: usize,
    ) -> Result<Self> {
        let mut text = Self::new(
            std::iter::once("year".to_string()).chain(categories.iter().map(ToString::to_string)),
        );
        for year in years {
            let mut row = vec![year.to_string()];
            for category in categories {
                row.push(format_value(table.get(*year, *category)?, precision));
            }
            text.push_row(row);
        }

        Ok(text)
    }

    /// The display width of each column
    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<_> = self.header.iter().map(String::len).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                } else {
                    widths.push(cell.len());
                }
            }
        }

        widths
    }
}

/// Write one line of cells padded to `widths`
fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == 0 {
            write!(f, "{cell:<width$}")?;
        } else {
            write!(f, "  {cell:>width$}")?;
        }
    }

    writeln!(f)
}

impl fmt::Display for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_line(f, &self.header, &widths)?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::year::YearAxis;

    #[test]
    fn test_alignment() {
        let mut table = TextTable::new(["metric", "value"]);
        table.push_row(["Total cost", "1234"]);
        table.push_row(["LCOE", "5"]);
        assert_eq!(
            table.to_string(),
            "metric      value\nTotal cost   1234\nLCOE            5\n"
        );
    }

    #[test]
    fn test_from_year_table() {
        let axis = YearAxis::new(2020, 2022).unwrap();
        let data = YearTable::new(axis, [(Source::Coal, vec![1.0, 2.25, 3.5])]).unwrap();
        let text = TextTable::from_year_table(&data, &[Source::Coal], &[2020, 2022], 1).unwrap();
        assert_eq!(text.len(), 2);
        assert_eq!(text.to_string(), "year  Coal\n2020   1.0\n2022   3.5\n");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1.26, 1), "1.3");
        assert_eq!(format_value(f64::INFINITY, 1), "inf");
    }
}
