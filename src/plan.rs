//! Power development plans: capacity additions and retirements, and the capacities and production
//! they imply.
use crate::digest::{short_digest, write_section};
use crate::report::{TextTable, format_value};
use crate::source::{Source, capacity_sources, fuels, sources};
use crate::table::{CategoryValues, Series, YearTable, check_same_axis};
use crate::units::GWH_PER_MW_YEAR;
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use std::fmt;

pub mod retrofit;
pub use retrofit::{CcsRetrofit, Pilot};

/// The number of hex characters in a plan digest.
///
/// 16 bits keeps signatures short in reports, but collisions between different plans are
/// plausible once a few hundred are compared. Plans are compared by contents, never by digest.
const PLAN_DIGEST_LENGTH: usize = 4;

/// Years shown in plan and run summaries, in addition to the first and last years of the axis
pub const KEY_YEARS: [u32; 4] = [2020, 2025, 2030, 2040];

/// The years shown in summaries by default: the ends of the axis plus [`KEY_YEARS`]
pub fn default_milestones(axis: YearAxis) -> Vec<u32> {
    axis.filter_years(
        [axis.start(), axis.end()]
            .into_iter()
            .chain(KEY_YEARS),
    )
}

/// Check a table of capacity changes, returning it with a column for every capacity category
fn check_capacity_table(name: &str, table: &YearTable, axis: YearAxis) -> Result<YearTable> {
    check_same_axis(axis, table.axis()).with_context(|| format!("Invalid {name} table"))?;
    ensure!(
        !table.contains(Source::Import),
        "Invalid {name} table: {} has no capacity",
        Source::Import
    );
    table
        .require(fuels())
        .with_context(|| format!("Invalid {name} table"))?;

    Ok(table.select_or_zero(capacity_sources()))
}

/// Check capacity factors, returning a table with a column for every fuel
fn check_capacity_factor(table: &YearTable, axis: YearAxis) -> Result<YearTable> {
    check_same_axis(axis, table.axis()).context("Invalid capacity factor table")?;
    for (year, category, value) in table.iter_entries() {
        ensure!(
            (0.0..=1.0).contains(&value),
            "Capacity factor for {category} in {year} must be between 0 and 1 (got {value})"
        );
    }

    // Fuels without a capacity factor produce nothing
    Ok(table.select_or_zero(fuels()))
}

/// Check opening capacities, returning a value for every capacity category
fn check_opening_capacity(opening: &CategoryValues) -> Result<CategoryValues> {
    for (category, value) in opening.iter() {
        ensure!(
            category.has_capacity(),
            "Opening capacity given for {category}, which has no capacity"
        );
        ensure!(
            value.is_finite() && value >= 0.0,
            "Opening capacity for {category} must be a finite, non-negative number (got {value})"
        );
    }

    Ok(capacity_sources()
        .map(|c| (c, opening.get_or_zero(c)))
        .collect())
}

/// Log a warning for each category whose capacity becomes negative
fn warn_negative_capacity(description: &str, capacities: &YearTable) {
    for (category, values) in capacities.iter_columns() {
        let first_negative = capacities
            .axis()
            .years()
            .zip(values)
            .find(|(_, value)| **value < 0.0);
        if let Some((year, value)) = first_negative {
            warn!(
                "{description}: {category} capacity is negative from {year} ({value:.1} MW). \
                Retirement exceeds installed capacity."
            );
        }
    }
}

/// A power development program.
///
/// Capacities and production are derived on construction and never change afterwards: variants
/// of a plan are built with [`Plan::variant`].
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    description: String,
    axis: YearAxis,
    /// Capacity added each year (MW)
    additions: YearTable,
    /// Capacity retired each year (MW)
    retirement: YearTable,
    /// Fraction of capacity used on average, for each fuel
    capacity_factor: YearTable,
    /// Net imports (GWh)
    net_import: Series,
    /// Capacity in service before the first year (MW)
    opening_capacity: CategoryValues,
    /// Installed capacity at the end of each year (MW)
    capacities: YearTable,
    /// Production by source (GWh)
    production: YearTable,
    /// Production summed across sources (GWh)
    total_production: Series,
    digest: String,
}

impl Plan {
    /// Create a new [`Plan`].
    ///
    /// # Arguments
    ///
    /// * `description` - Human-readable description of the plan
    /// * `axis` - The year axis to which all tables must be aligned
    /// * `additions` - Capacity added in each year (MW). Must have a column for every fuel.
    /// * `retirement` - Capacity retired in each year (MW). Must have a column for every fuel.
    /// * `capacity_factor` - Capacity factors between 0 and 1. Missing fuels produce nothing.
    /// * `net_import` - Net imports in each year (GWh)
    /// * `opening_capacity` - Capacity already in service before the first year (MW)
    pub fn new(
        description: &str,
        axis: YearAxis,
        additions: &YearTable,
        retirement: &YearTable,
        capacity_factor: &YearTable,
        net_import: &Series,
        opening_capacity: &CategoryValues,
    ) -> Result<Self> {
        let additions = check_capacity_table("additions", additions, axis)?;
        let retirement = check_capacity_table("retirement", retirement, axis)?;
        let capacity_factor = check_capacity_factor(capacity_factor, axis)?;
        check_same_axis(axis, net_import.axis()).context("Invalid net imports")?;
        let opening_capacity = check_opening_capacity(opening_capacity)?;

        let capacities = additions
            .sub(&retirement)?
            .cumulative_sum()
            .add_values(&opening_capacity)?;
        warn_negative_capacity(description, &capacities);

        let production = capacities
            .select(fuels())?
            .mul_table(&capacity_factor)?
            .scaled(GWH_PER_MW_YEAR)
            .with_column(Source::Import, net_import)?;
        let total_production = production.row_sum();

        let mut plan = Self {
            description: description.to_string(),
            axis,
            additions,
            retirement,
            capacity_factor,
            net_import: net_import.clone(),
            opening_capacity,
            capacities,
            production,
            total_production,
            digest: String::new(),
        };
        plan.digest = plan.compute_digest();

        Ok(plan)
    }

    /// A new plan with different additions and retirement, sharing this plan's capacity factors,
    /// net imports and opening capacity
    pub fn variant(
        &self,
        description: &str,
        additions: &YearTable,
        retirement: &YearTable,
    ) -> Result<Self> {
        Self::new(
            description,
            self.axis,
            additions,
            retirement,
            &self.capacity_factor,
            &self.net_import,
            &self.opening_capacity,
        )
    }

    /// Digest of a canonical dump of the plan's contents
    fn compute_digest(&self) -> String {
        let mut text = String::new();
        write_section(&mut text, "additions", &self.additions);
        write_section(&mut text, "retirement", &self.retirement);
        write_section(&mut text, "capacities", &self.capacities);
        write_section(&mut text, "production", &self.production);
        short_digest(&text, PLAN_DIGEST_LENGTH)
    }

    /// A short identifier derived from the plan's contents
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The year axis
    pub fn axis(&self) -> YearAxis {
        self.axis
    }

    /// Capacity added each year (MW), for every capacity category
    pub fn additions(&self) -> &YearTable {
        &self.additions
    }

    /// Capacity retired each year (MW), for every capacity category
    pub fn retirement(&self) -> &YearTable {
        &self.retirement
    }

    /// Capacity factors, for every fuel
    pub fn capacity_factor(&self) -> &YearTable {
        &self.capacity_factor
    }

    /// Net imports (GWh)
    pub fn net_import(&self) -> &Series {
        &self.net_import
    }

    /// Capacity in service before the first year (MW), for every capacity category
    pub fn opening_capacity(&self) -> &CategoryValues {
        &self.opening_capacity
    }

    /// Installed capacity at the end of each year (MW), for every capacity category
    pub fn capacities(&self) -> &YearTable {
        &self.capacities
    }

    /// Production (GWh) for every source, including imports
    pub fn production(&self) -> &YearTable {
        &self.production
    }

    /// Total production across sources (GWh)
    pub fn total_production(&self) -> &Series {
        &self.total_production
    }

    /// Text summary of the plan, showing only the given years
    pub fn summary(&self, milestones: &[u32]) -> Result<String> {
        let years = self.axis.filter_years(milestones.iter().copied());
        let capacity_columns = capacity_sources().collect_vec();
        let fuel_columns = fuels().collect_vec();
        let source_columns = sources().collect_vec();

        let mut production =
            TextTable::from_year_table(&self.production, &source_columns, &years, 0)?;
        let mut totals = Vec::new();
        for year in &years {
            totals.push(format_value(self.total_production.get(*year)?, 0));
        }
        production.push_column("Total", totals);

        Ok(format!(
            "{self}\n\n\
            Annual generation capacity addition by fuel type (MW)\n{}\n\
            Old capacity retirement by fuel type (MW)\n{}\n\
            Generation capacity by fuel type (MW)\n{}\n\
            Electricity production (GWh)\n{production}\n\
            Capacity factors\n{}",
            TextTable::from_year_table(&self.additions, &capacity_columns, &years, 0)?,
            TextTable::from_year_table(&self.retirement, &fuel_columns, &years, 0)?,
            TextTable::from_year_table(&self.capacities, &capacity_columns, &years, 0)?,
            TextTable::from_year_table(&self.capacity_factor, &fuel_columns, &years, 2)?,
        ))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Power development program #{}: {}",
            self.digest, self.description
        )
    }
}
