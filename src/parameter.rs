//! The technical and economic environment in which plans are evaluated.
//!
//! A [`Parameter`] bundles the technology database (costs, heat rates, emission and capture
//! factors), the carbon price trajectory and the discount rate. Bundles are immutable: the
//! `with_*` methods return modified copies, sharing any tables which are unchanged.
use crate::digest::{short_digest, write_float, write_section};
use crate::finance::check_discount_rate;
use crate::report::{TextTable, format_value};
use crate::salvage::PlantLifeMap;
use crate::source::{Source, fuels, sources};
use crate::table::{CategoryValues, Series, YearTable, check_same_axis};
use crate::units::Dimensionless;
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use std::fmt::{self, Write};
use std::sync::Arc;
use strum::{Display, EnumIter};

/// The number of hex characters in a parameter digest
const PARAMETER_DIGEST_LENGTH: usize = 6;

/// Years at which the carbon price is shown in summaries (with the ends of the axis)
const CARBON_PRICE_KEY_YEARS: [u32; 2] = [2030, 2040];

/// One of the year × category tables of a [`Parameter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CostAttribute {
    /// Overnight construction cost ($/kW)
    #[strum(to_string = "construction cost")]
    ConstructionCost,
    /// Fixed operating cost ($/kW/yr)
    #[strum(to_string = "fixed operating cost")]
    FixedOperatingCost,
    /// Variable operating cost ($/MWh)
    #[strum(to_string = "variable operating cost")]
    VariableOperatingCost,
    /// Heat rate (Btu/kWh)
    #[strum(to_string = "heat rate")]
    HeatRate,
    /// Heat price ($/MBtu)
    #[strum(to_string = "heat price")]
    HeatPrice,
    /// Capture factor (gCO2/kWh)
    #[strum(to_string = "capture factor")]
    CaptureFactor,
}

/// The raw inputs from which a [`Parameter`] is built
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInputs {
    /// Human-readable description
    pub description: String,
    /// Discount rate
    pub discount_rate: Dimensionless,
    /// Plant accounting life (years), for every fuel
    pub plant_accounting_life: PlantLifeMap,
    /// Overnight construction cost ($/kW), for every fuel
    pub construction_cost: YearTable,
    /// Fixed operating cost ($/kW/yr), for every fuel
    pub fixed_operating_cost: YearTable,
    /// Variable operating cost ($/MWh), for every source including imports
    pub variable_operating_cost: YearTable,
    /// Heat rate (Btu/kWh). Missing sources are treated as zero.
    pub heat_rate: YearTable,
    /// Heat price ($/MBtu). Missing sources are treated as zero.
    pub heat_price: YearTable,
    /// Emission factor (gCO2eq/kWh), for every source including imports
    pub emission_factor: CategoryValues,
    /// Capture factor (gCO2/kWh). Missing sources are treated as zero.
    pub capture_factor: YearTable,
    /// Carbon price ($/tCO2eq)
    pub carbon_price: Series,
}

/// Check the discount rate, warning if it is unusual
fn check_rate(rate: Dimensionless) -> Result<()> {
    check_discount_rate(rate)?;
    if !(rate > Dimensionless(0.0) && rate < Dimensionless(1.0)) {
        warn!("Discount rate {rate} is outside the usual range (0, 1)");
    }

    Ok(())
}

/// Check plant lives, returning one for every fuel
fn check_plant_life(plant_life: &PlantLifeMap) -> Result<PlantLifeMap> {
    fuels()
        .map(|fuel| -> Result<_> {
            let life = *plant_life
                .get(&fuel)
                .with_context(|| format!("No plant accounting life for {fuel}"))?;
            ensure!(life > 0, "Plant accounting life for {fuel} must be positive");
            Ok((fuel, life))
        })
        .try_collect()
}

/// Check that a table is on `axis`, returning a copy with only the given columns.
///
/// If `strict`, every column must be present; otherwise missing columns are filled with zeros.
fn check_table<I>(
    attribute: CostAttribute,
    table: &YearTable,
    axis: YearAxis,
    categories: I,
    strict: bool,
) -> Result<Arc<YearTable>>
where
    I: IntoIterator<Item = Source>,
{
    check_same_axis(axis, table.axis()).with_context(|| format!("Invalid {attribute} table"))?;
    let table = if strict {
        table
            .select(categories)
            .with_context(|| format!("Invalid {attribute} table"))?
    } else {
        table.select_or_zero(categories)
    };

    Ok(Arc::new(table))
}

/// A technical and economic environment.
///
/// Tables are shared between copies made by the `with_*` methods and are never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    description: String,
    axis: YearAxis,
    discount_rate: Dimensionless,
    plant_accounting_life: Arc<PlantLifeMap>,
    construction_cost: Arc<YearTable>,
    fixed_operating_cost: Arc<YearTable>,
    variable_operating_cost: Arc<YearTable>,
    heat_rate: Arc<YearTable>,
    heat_price: Arc<YearTable>,
    emission_factor: Arc<CategoryValues>,
    capture_factor: Arc<YearTable>,
    carbon_price: Arc<Series>,
    digest: String,
}

impl Parameter {
    /// Create a new [`Parameter`], checking that the inputs are complete and consistent.
    ///
    /// The year axis is taken from the construction cost table.
    pub fn new(inputs: ParameterInputs) -> Result<Self> {
        let axis = inputs.construction_cost.axis();
        check_rate(inputs.discount_rate)?;
        let plant_accounting_life = check_plant_life(&inputs.plant_accounting_life)?;
        let emission_factor: CategoryValues = sources()
            .map(|source| Ok::<_, anyhow::Error>((source, inputs.emission_factor.get(source)?)))
            .try_collect()
            .context("Invalid emission factor")?;
        emission_factor
            .check_finite()
            .context("Invalid emission factor")?;
        check_same_axis(axis, inputs.carbon_price.axis()).context("Invalid carbon price")?;

        let parameter = Self {
            description: inputs.description,
            axis,
            discount_rate: inputs.discount_rate,
            plant_accounting_life: Arc::new(plant_accounting_life),
            construction_cost: check_table(
                CostAttribute::ConstructionCost,
                &inputs.construction_cost,
                axis,
                fuels(),
                true,
            )?,
            fixed_operating_cost: check_table(
                CostAttribute::FixedOperatingCost,
                &inputs.fixed_operating_cost,
                axis,
                fuels(),
                true,
            )?,
            variable_operating_cost: check_table(
                CostAttribute::VariableOperatingCost,
                &inputs.variable_operating_cost,
                axis,
                sources(),
                true,
            )?,
            heat_rate: check_table(
                CostAttribute::HeatRate,
                &inputs.heat_rate,
                axis,
                sources(),
                false,
            )?,
            heat_price: check_table(
                CostAttribute::HeatPrice,
                &inputs.heat_price,
                axis,
                sources(),
                false,
            )?,
            emission_factor: Arc::new(emission_factor),
            capture_factor: check_table(
                CostAttribute::CaptureFactor,
                &inputs.capture_factor,
                axis,
                sources(),
                false,
            )?,
            carbon_price: Arc::new(inputs.carbon_price),
            digest: String::new(),
        };

        Ok(parameter.with_digest())
    }

    /// Recompute the digest after a change of contents
    fn with_digest(mut self) -> Self {
        self.digest = short_digest(&self.canonical_text(), PARAMETER_DIGEST_LENGTH);
        self
    }

    /// Canonical rendering of every attribute
    fn canonical_text(&self) -> String {
        let mut text = String::new();
        writeln!(text, "[description]\n{}", self.description).unwrap();
        text.push_str("[discount_rate]\n");
        write_float(&mut text, self.discount_rate.0);
        text.push_str("\n[plant_accounting_life]\n");
        for (source, life) in self.plant_accounting_life.iter() {
            write!(text, "{source}={life};").unwrap();
        }
        text.push('\n');
        write_section(&mut text, "emission_factor", &*self.emission_factor);
        for attribute in [
            CostAttribute::ConstructionCost,
            CostAttribute::FixedOperatingCost,
            CostAttribute::VariableOperatingCost,
            CostAttribute::HeatRate,
            CostAttribute::HeatPrice,
            CostAttribute::CaptureFactor,
        ] {
            write_section(&mut text, &attribute.to_string(), self.table(attribute));
        }
        write_section(&mut text, "carbon_price", &*self.carbon_price);

        text
    }

    /// A short identifier derived from every attribute
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The year axis of every table
    pub fn axis(&self) -> YearAxis {
        self.axis
    }

    /// Discount rate
    pub fn discount_rate(&self) -> Dimensionless {
        self.discount_rate
    }

    /// Plant accounting life (years) for every fuel
    pub fn plant_accounting_life(&self) -> &PlantLifeMap {
        &self.plant_accounting_life
    }

    /// One of the year × category tables
    pub fn table(&self, attribute: CostAttribute) -> &YearTable {
        match attribute {
            CostAttribute::ConstructionCost => &self.construction_cost,
            CostAttribute::FixedOperatingCost => &self.fixed_operating_cost,
            CostAttribute::VariableOperatingCost => &self.variable_operating_cost,
            CostAttribute::HeatRate => &self.heat_rate,
            CostAttribute::HeatPrice => &self.heat_price,
            CostAttribute::CaptureFactor => &self.capture_factor,
        }
    }

    /// Mutable access to the shared pointer for one of the tables
    fn table_mut(&mut self, attribute: CostAttribute) -> &mut Arc<YearTable> {
        match attribute {
            CostAttribute::ConstructionCost => &mut self.construction_cost,
            CostAttribute::FixedOperatingCost => &mut self.fixed_operating_cost,
            CostAttribute::VariableOperatingCost => &mut self.variable_operating_cost,
            CostAttribute::HeatRate => &mut self.heat_rate,
            CostAttribute::HeatPrice => &mut self.heat_price,
            CostAttribute::CaptureFactor => &mut self.capture_factor,
        }
    }

    /// Overnight construction cost ($/kW)
    pub fn construction_cost(&self) -> &YearTable {
        &self.construction_cost
    }

    /// Fixed operating cost ($/kW/yr)
    pub fn fixed_operating_cost(&self) -> &YearTable {
        &self.fixed_operating_cost
    }

    /// Variable operating cost ($/MWh)
    pub fn variable_operating_cost(&self) -> &YearTable {
        &self.variable_operating_cost
    }

    /// Heat rate (Btu/kWh)
    pub fn heat_rate(&self) -> &YearTable {
        &self.heat_rate
    }

    /// Heat price ($/MBtu)
    pub fn heat_price(&self) -> &YearTable {
        &self.heat_price
    }

    /// Emission factor (gCO2eq/kWh)
    pub fn emission_factor(&self) -> &CategoryValues {
        &self.emission_factor
    }

    /// Capture factor (gCO2/kWh)
    pub fn capture_factor(&self) -> &YearTable {
        &self.capture_factor
    }

    /// Carbon price ($/tCO2eq)
    pub fn carbon_price(&self) -> &Series {
        &self.carbon_price
    }

    /// A copy with a different description
    pub fn with_description(&self, description: &str) -> Self {
        let mut parameter = self.clone();
        parameter.description = description.to_string();
        parameter.with_digest()
    }

    /// A copy with a different discount rate
    pub fn with_discount_rate(&self, discount_rate: Dimensionless) -> Result<Self> {
        check_rate(discount_rate)?;
        let mut parameter = self.clone();
        parameter.discount_rate = discount_rate;
        Ok(parameter.with_digest())
    }

    /// A copy with a different carbon price trajectory
    pub fn with_carbon_price(&self, carbon_price: &Series) -> Result<Self> {
        check_same_axis(self.axis, carbon_price.axis()).context("Invalid carbon price")?;
        let carbon_price = Series::new(self.axis, carbon_price.values().to_vec())
            .context("Invalid carbon price")?;
        let mut parameter = self.clone();
        parameter.carbon_price = Arc::new(carbon_price);
        Ok(parameter.with_digest())
    }

    /// A copy with the carbon price multiplied by `factor` in every year
    pub fn with_scaled_carbon_price(&self, factor: f64) -> Result<Self> {
        self.with_carbon_price(&self.carbon_price.scaled(factor))
    }

    /// A copy in which one column of one table is multiplied, year by year, by `factor`.
    ///
    /// Typically `factor` is a trend such as [`crate::finance::discount_series`].
    pub fn with_column_scaled(
        &self,
        attribute: CostAttribute,
        category: Source,
        factor: &Series,
    ) -> Result<Self> {
        let table = self.table(attribute);
        let column = table
            .column_series(category)
            .with_context(|| format!("Cannot scale {attribute}"))?;
        let scaled = column.zip_with(factor, |value, f| value * f)?;

        let mut parameter = self.clone();
        *parameter.table_mut(attribute) = Arc::new(table.with_column(category, &scaled)?);
        Ok(parameter.with_digest())
    }

    /// Text summary: start-year values and first-year trends for each source, the carbon price at
    /// key years and the discount rate
    pub fn summary(&self) -> Result<String> {
        let start = self.axis.start();
        let columns = sources().collect_vec();
        let mut table = TextTable::new(
            std::iter::once(String::new()).chain(columns.iter().map(ToString::to_string)),
        );

        let mut push_row = |label: &str, value: &dyn Fn(Source) -> Option<f64>| {
            let mut row = vec![label.to_string()];
            row.extend(
                columns
                    .iter()
                    .map(|c| value(*c).map_or_else(String::new, |v| format_value(v, 1))),
            );
            table.push_row(row);
        };

        let life = |c: Source| self.plant_accounting_life.get(&c).map(|l| f64::from(*l));
        let at_start = |data: &YearTable, c: Source| data.get(start, c).ok();
        let trend = |data: &YearTable, c: Source| {
            Some(data.get(start + 1, c).ok()? - data.get(start, c).ok()?)
        };

        push_row("Plant accounting life (year)", &life);
        push_row("Emission factor (gCO2eq/kWh)", &|c| {
            self.emission_factor.get(c).ok()
        });
        push_row("Capture factor (gCO2/kWh)", &|c| {
            at_start(&self.capture_factor, c)
        });
        push_row("Overnight construction costs ($/kW)", &|c| {
            at_start(&self.construction_cost, c)
        });
        push_row("Overnight construction costs trend ($/kW/yr)", &|c| {
            trend(&self.construction_cost, c)
        });
        push_row("Fixed operating costs ($/kW/yr)", &|c| {
            at_start(&self.fixed_operating_cost, c)
        });
        push_row("Fixed operating costs trend ($/kW/yr/yr)", &|c| {
            trend(&self.fixed_operating_cost, c)
        });
        push_row("Variable operating costs ($/MWh)", &|c| {
            at_start(&self.variable_operating_cost, c)
        });
        push_row("Heat rate (Btu/kWh)", &|c| at_start(&self.heat_rate, c));
        push_row("Heat price ($/MBtu)", &|c| at_start(&self.heat_price, c));

        let mut carbon_price = TextTable::new(["year", "$/tCO2eq"]);
        let key_years = self.axis.filter_years(
            [start, self.axis.end()]
                .into_iter()
                .chain(CARBON_PRICE_KEY_YEARS),
        );
        for year in key_years {
            let price = format_value(self.carbon_price.get(year)?, 1);
            carbon_price.push_row([year.to_string(), price]);
        }

        Ok(format!(
            "{self}\n\n{table}\nCarbon price ($/tCO2eq)\n{carbon_price}\nDiscount rate: {}",
            self.discount_rate
        ))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameters #{}: {}", self.digest, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::discount_series;
    use crate::fixture::{assert_error, parameter, parameter_inputs};
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    fn test_digest_identical_inputs(parameter_inputs: ParameterInputs) {
        let a = Parameter::new(parameter_inputs.clone()).unwrap();
        let b = Parameter::new(parameter_inputs).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 6);
        assert_eq!(a, b);
    }

    #[rstest]
    fn test_digest_changes_with_each_attribute(
        parameter_inputs: ParameterInputs,
        parameter: Parameter,
    ) {
        let trend = Series::constant(parameter.axis(), 1.01);
        let mut variants = vec![
            parameter.with_description("Other"),
            parameter.with_discount_rate(Dimensionless(0.07)).unwrap(),
            parameter.with_scaled_carbon_price(2.0).unwrap(),
        ];
        for attribute in CostAttribute::iter() {
            variants.push(
                parameter
                    .with_column_scaled(attribute, Source::CoalCCS, &trend)
                    .unwrap(),
            );
        }

        let mut inputs = parameter_inputs.clone();
        inputs.plant_accounting_life.insert(Source::Coal, 41);
        variants.push(Parameter::new(inputs).unwrap());

        let mut inputs = parameter_inputs;
        inputs.emission_factor = sources()
            .map(|s| (s, inputs.emission_factor.get(s).unwrap() + 1.0))
            .collect();
        variants.push(Parameter::new(inputs).unwrap());

        for variant in &variants {
            assert_ne!(variant.digest(), parameter.digest(), "{variant}");
        }
        assert_eq!(variants.iter().map(Parameter::digest).unique().count(), variants.len());
    }

    #[rstest]
    fn test_builders_do_not_modify_original(parameter: Parameter) {
        let before = parameter.clone();
        let trend = discount_series(Dimensionless(0.03), parameter.axis()).unwrap();
        let cheaper = parameter
            .with_column_scaled(CostAttribute::HeatPrice, Source::Gas, &trend)
            .unwrap();
        assert_eq!(parameter, before);

        let end = parameter.axis().end();
        let original = parameter.heat_price().get(end, Source::Gas).unwrap();
        assert_eq!(
            cheaper.heat_price().get(end, Source::Gas).unwrap(),
            original * trend.get(end).unwrap()
        );

        // Untouched tables are shared, not copied
        assert!(Arc::ptr_eq(&parameter.heat_rate, &cheaper.heat_rate));
    }

    #[rstest]
    fn test_with_scaled_carbon_price(parameter: Parameter) {
        let scaled = parameter.with_scaled_carbon_price(1.75).unwrap();
        let end = parameter.axis().end();
        assert_eq!(
            scaled.carbon_price().get(end).unwrap(),
            1.75 * parameter.carbon_price().get(end).unwrap()
        );
        assert_error!(
            parameter.with_scaled_carbon_price(f64::INFINITY),
            "Invalid carbon price"
        );
    }

    #[rstest]
    fn test_with_carbon_price(parameter: Parameter) {
        let axis = parameter.axis();
        let flat = Series::constant(axis, 30.0);
        let priced = parameter.with_carbon_price(&flat).unwrap();
        assert_eq!(priced.carbon_price(), &flat);
        assert_ne!(priced.digest(), parameter.digest());
        assert_eq!(priced.construction_cost(), parameter.construction_cost());

        // Equal values give equal digests, whatever the sign of zero
        let zero = parameter.with_carbon_price(&Series::zeros(axis)).unwrap();
        let negative_zero = parameter
            .with_carbon_price(&Series::constant(axis, -0.0))
            .unwrap();
        assert_eq!(zero, negative_zero);
        assert_eq!(zero.digest(), negative_zero.digest());

        let other_axis = YearAxis::new(axis.start(), axis.end() + 1).unwrap();
        assert_error!(
            parameter.with_carbon_price(&Series::zeros(other_axis)),
            "Invalid carbon price"
        );
    }

    #[rstest]
    #[case(-1.0)]
    #[case(-1.5)]
    #[case(f64::NAN)]
    fn test_invalid_discount_rate(parameter: Parameter, #[case] rate: f64) {
        assert!(parameter.with_discount_rate(Dimensionless(rate)).is_err());
    }

    #[rstest]
    fn test_zero_plant_life(parameter_inputs: ParameterInputs) {
        let mut inputs = parameter_inputs;
        inputs.plant_accounting_life.insert(Source::Wind, 0);
        assert_error!(
            Parameter::new(inputs),
            "Plant accounting life for Wind must be positive"
        );
    }

    #[rstest]
    fn test_missing_construction_cost(parameter_inputs: ParameterInputs) {
        let mut inputs = parameter_inputs;
        inputs.construction_cost = inputs
            .construction_cost
            .select(fuels().filter(|f| *f != Source::Solar))
            .unwrap();
        assert_error!(Parameter::new(inputs), "Invalid construction cost table");
    }

    #[rstest]
    fn test_missing_heat_rate_is_zero(parameter_inputs: ParameterInputs) {
        let mut inputs = parameter_inputs;
        inputs.heat_rate = inputs.heat_rate.select([Source::Coal]).unwrap();
        let parameter = Parameter::new(inputs).unwrap();
        assert_eq!(
            parameter.heat_rate().column(Source::Gas).unwrap(),
            vec![0.0; parameter.axis().len()]
        );
    }

    #[rstest]
    fn test_missing_emission_factor(parameter_inputs: ParameterInputs) {
        let mut inputs = parameter_inputs;
        inputs.emission_factor = [(Source::Coal, 900.0)].into_iter().collect();
        assert_error!(Parameter::new(inputs), "Invalid emission factor");
    }

    #[rstest]
    fn test_non_finite_emission_factor(parameter_inputs: ParameterInputs) {
        let mut inputs = parameter_inputs;
        inputs.emission_factor = sources()
            .map(|s| (s, if s == Source::Oil { f64::NAN } else { 100.0 }))
            .collect();
        assert_error!(Parameter::new(inputs), "Invalid emission factor");
    }

    #[rstest]
    fn test_display_and_summary(parameter: Parameter) {
        assert_eq!(
            parameter.to_string(),
            format!("Parameters #{}: Test parameters", parameter.digest())
        );
        let summary = parameter.summary().unwrap();
        assert!(summary.contains("Overnight construction costs ($/kW)"));
        assert!(summary.contains("Discount rate: 0.06"));
    }
}
