//! Evaluation of one plan in one environment: costs, LCOE, emissions and capture.
use crate::finance::{present_value, present_value_table};
use crate::parameter::Parameter;
use crate::plan::Plan;
use crate::report::{TextTable, format_value};
use crate::salvage::salvage_table;
use crate::source::{Source, ccs, fuels, sources};
use crate::table::{CategoryValues, Series, YearTable, check_same_axis};
use crate::units::{
    BN_USD_PER_MUSD, Emissions, Energy, G_PER_KWH_PER_KT_PER_GWH, GT_PER_KT,
    KT_PER_GWH_G_PER_KWH, MT_PER_KT, MUSD_PER_GWH_USD_PER_MWH, MUSD_PER_KT_USD_PER_T,
    MUSD_PER_MW_USD_PER_KW, MUSD_PER_TBTU_USD_PER_MBTU, Money, MoneyPerEnergy,
    TBTU_PER_GWH_BTU_PER_KWH, TWH_PER_GWH,
};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Years at which carbon intensity is reported, with the ends of the axis
const CARBON_INTENSITY_KEY_YEARS: [u32; 1] = [2030];

/// Years at which captured CO2 is reported
const CARBON_CAPTURED_KEY_YEARS: [u32; 5] = [2025, 2030, 2035, 2040, 2050];

/// A headline figure reported for each run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
pub enum Metric {
    /// Discounted electricity production
    #[strum(to_string = "Power produced")]
    PowerProduced,
    /// Levelised cost of electricity
    #[strum(to_string = "System LCOE")]
    SystemLcoe,
    /// Discounted total cost, net of salvage value
    #[strum(to_string = "Total cost")]
    TotalCost,
    /// Discounted construction cost
    #[strum(to_string = "Construction")]
    Construction,
    /// Discounted fuel cost
    #[strum(to_string = "Fuel cost")]
    FuelCost,
    /// Discounted fixed and variable operating costs
    #[strum(to_string = "O&M")]
    OperatingCost,
    /// Discounted residual value of plants at the end of the horizon, as a negative cost
    #[strum(to_string = "Salvage value")]
    SalvageValue,
    /// Cumulative greenhouse gas emissions
    #[strum(to_string = "CO2 emissions")]
    Emissions,
    /// Cumulative CO2 captured
    #[strum(to_string = "CO2 capture")]
    Capture,
    /// Discounted cost of emissions at the carbon price
    #[strum(to_string = "CO2 cost")]
    ExternalCost,
    /// Total cost plus the cost of emissions
    #[strum(to_string = "Cost with CO2")]
    CostWithExternal,
}

impl Metric {
    /// The unit in which the metric is reported
    pub fn unit(self) -> &'static str {
        match self {
            Self::PowerProduced => "TWh",
            Self::SystemLcoe => "USD/MWh",
            Self::Emissions => "GtCO2eq",
            Self::Capture => "GtCO2",
            _ => "bn USD",
        }
    }

    /// Decimal places shown in reports
    pub fn precision(self) -> usize {
        match self {
            Self::SystemLcoe | Self::Emissions | Self::Capture => 1,
            _ => 0,
        }
    }
}

/// The value of every [`Metric`] for a run, in reporting units.
///
/// Values are kept at full precision; rounding only happens when they are displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals([f64; Metric::COUNT]);

impl Totals {
    /// Compute the value of each metric with `f`
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Metric) -> f64,
    {
        let mut values = [0.0; Metric::COUNT];
        for metric in Metric::iter() {
            values[metric as usize] = f(metric);
        }

        Self(values)
    }

    /// The value of `metric`
    pub fn get(&self, metric: Metric) -> f64 {
        self.0[metric as usize]
    }

    /// Iterate over `(metric, value)` pairs in reporting order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::iter().map(|metric| (metric, self.get(metric)))
    }

    /// Element-wise `self - baseline`
    pub fn difference(&self, baseline: &Totals) -> Totals {
        Totals::from_fn(|metric| self.get(metric) - baseline.get(metric))
    }
}

/// Scale every value of a [`CategoryValues`]
fn scale_values(values: &CategoryValues, factor: f64) -> CategoryValues {
    values.iter().map(|(c, v)| (c, v * factor)).collect()
}

/// Sum of the present values of every column of a table
fn total_present_value(table: &YearTable, parameter: &Parameter) -> Result<f64> {
    Ok(present_value_table(table, parameter.discount_rate())?.sum())
}

/// A run of the model: one plan evaluated in one technical and economic environment.
///
/// All the computation is done on construction; afterwards the run is read-only.
#[derive(Debug, Clone)]
pub struct Run {
    plan: Arc<Plan>,
    parameter: Parameter,
    signature: String,
    /// Construction costs (MUSD)
    investment: YearTable,
    /// Undepreciated capacity additions at the end of the horizon, counted as a cost offset
    salvage_value: YearTable,
    /// Fixed operating costs (MUSD)
    fixed_om_cost: YearTable,
    /// Variable operating costs (MUSD)
    variable_om_cost: YearTable,
    /// Heat used (TBtu)
    heat_used: YearTable,
    /// Fuel costs (MUSD)
    fuel_cost: YearTable,
    /// Greenhouse gas emissions (ktCO2eq)
    emissions: YearTable,
    /// Total emissions across sources (ktCO2eq)
    total_emissions_by_year: Series,
    /// CO2 captured (ktCO2)
    capture: YearTable,
    /// Total capture across sources (ktCO2)
    total_capture_by_year: Series,
    /// Cost of emissions at the carbon price (MUSD)
    external_cost: Series,
    total_production: Energy,
    total_investment: Money,
    total_salvage_value: Money,
    total_fixed_om_cost: Money,
    total_variable_om_cost: Money,
    total_fuel_cost: Money,
    total_external_cost: Money,
    total_emissions: Emissions,
    total_capture: Emissions,
}

impl Run {
    /// Evaluate `plan` with `parameter`
    pub fn new(plan: &Arc<Plan>, parameter: &Parameter) -> Result<Self> {
        check_same_axis(plan.axis(), parameter.axis())
            .context("Plan and parameters must share a year axis")?;
        let signature = format!("#{}-{}", plan.digest(), parameter.digest());
        debug!("Evaluating run {signature}");

        let production = plan.production();
        let additions = plan.additions().select(fuels())?;
        let investment = additions
            .mul_table(parameter.construction_cost())?
            .scaled(MUSD_PER_MW_USD_PER_KW);
        let salvage_value = salvage_table(&additions, parameter.plant_accounting_life())?;
        let fixed_om_cost = plan
            .capacities()
            .select(fuels())?
            .mul_table(parameter.fixed_operating_cost())?
            .scaled(MUSD_PER_MW_USD_PER_KW);
        let variable_om_cost = production
            .mul_table(parameter.variable_operating_cost())?
            .scaled(MUSD_PER_GWH_USD_PER_MWH);
        let heat_used = production
            .mul_table(parameter.heat_rate())?
            .scaled(TBTU_PER_GWH_BTU_PER_KWH);
        let fuel_cost = heat_used
            .mul_table(parameter.heat_price())?
            .scaled(MUSD_PER_TBTU_USD_PER_MBTU);
        let emissions = production
            .mul_values(parameter.emission_factor())?
            .scaled(KT_PER_GWH_G_PER_KWH);
        let total_emissions_by_year = emissions.row_sum();
        let capture = production
            .mul_table(parameter.capture_factor())?
            .scaled(KT_PER_GWH_G_PER_KWH);
        let total_capture_by_year = capture.row_sum();
        let external_cost = total_emissions_by_year
            .zip_with(parameter.carbon_price(), |e, p| e * p)?
            .scaled(MUSD_PER_KT_USD_PER_T);

        let rate = parameter.discount_rate();
        let total_production = Energy(present_value(plan.total_production(), rate)?);
        if total_production.value() == 0.0 {
            warn!("Run {signature}: discounted production is zero, so the LCOE is undefined");
        }

        Ok(Self {
            total_investment: Money(total_present_value(&investment, parameter)?),
            total_salvage_value: Money(total_present_value(&salvage_value, parameter)?),
            total_fixed_om_cost: Money(total_present_value(&fixed_om_cost, parameter)?),
            total_variable_om_cost: Money(total_present_value(&variable_om_cost, parameter)?),
            total_fuel_cost: Money(total_present_value(&fuel_cost, parameter)?),
            total_external_cost: Money(present_value(&external_cost, rate)?),
            total_emissions: Emissions(total_emissions_by_year.sum()),
            total_capture: Emissions(total_capture_by_year.sum()),
            total_production,
            plan: Arc::clone(plan),
            parameter: parameter.clone(),
            signature,
            investment,
            salvage_value,
            fixed_om_cost,
            variable_om_cost,
            heat_used,
            fuel_cost,
            emissions,
            total_emissions_by_year,
            capture,
            total_capture_by_year,
            external_cost,
        })
    }

    /// Identifies the run by the digests of its plan and parameters, e.g. `#abcd-ef0123`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The plan evaluated
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// The parameters used
    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    /// Construction costs (MUSD)
    pub fn investment(&self) -> &YearTable {
        &self.investment
    }

    /// Residual value of plants, booked at the end of the horizon (MUSD)
    pub fn salvage_value(&self) -> &YearTable {
        &self.salvage_value
    }

    /// Fixed operating costs (MUSD)
    pub fn fixed_om_cost(&self) -> &YearTable {
        &self.fixed_om_cost
    }

    /// Variable operating costs (MUSD)
    pub fn variable_om_cost(&self) -> &YearTable {
        &self.variable_om_cost
    }

    /// Heat used (TBtu)
    pub fn heat_used(&self) -> &YearTable {
        &self.heat_used
    }

    /// Fuel costs (MUSD)
    pub fn fuel_cost(&self) -> &YearTable {
        &self.fuel_cost
    }

    /// Greenhouse gas emissions (ktCO2eq)
    pub fn emissions(&self) -> &YearTable {
        &self.emissions
    }

    /// Emissions summed across sources (ktCO2eq)
    pub fn total_emissions_by_year(&self) -> &Series {
        &self.total_emissions_by_year
    }

    /// CO2 captured (ktCO2)
    pub fn capture(&self) -> &YearTable {
        &self.capture
    }

    /// Capture summed across sources (ktCO2)
    pub fn total_capture_by_year(&self) -> &Series {
        &self.total_capture_by_year
    }

    /// Cost of emissions at the carbon price (MUSD)
    pub fn external_cost(&self) -> &Series {
        &self.external_cost
    }

    /// Discounted total production (GWh)
    pub fn total_production(&self) -> Energy {
        self.total_production
    }

    /// Discounted cost of construction, operation and fuel, net of salvage value (MUSD)
    pub fn total_cost(&self) -> Money {
        self.total_investment - self.total_salvage_value
            + self.total_fixed_om_cost
            + self.total_variable_om_cost
            + self.total_fuel_cost
    }

    /// Discounted cost of emissions (MUSD)
    pub fn total_external_cost(&self) -> Money {
        self.total_external_cost
    }

    /// Cumulative emissions over the horizon (ktCO2eq)
    pub fn total_emissions(&self) -> Emissions {
        self.total_emissions
    }

    /// Cumulative capture over the horizon (ktCO2)
    pub fn total_capture(&self) -> Emissions {
        self.total_capture
    }

    /// Levelised cost of electricity.
    ///
    /// Not finite if discounted production is zero.
    pub fn lcoe(&self) -> MoneyPerEnergy {
        self.total_cost() / self.total_production
    }

    /// Levelised cost of electricity, or an error if it is undefined
    pub fn checked_lcoe(&self) -> Result<MoneyPerEnergy> {
        let lcoe = self.lcoe();
        ensure!(
            lcoe.is_finite(),
            "LCOE is undefined for run {}: discounted production is zero",
            self.signature
        );

        Ok(lcoe)
    }

    /// The headline figures
    pub fn total(&self) -> Totals {
        let bn_usd = |money: Money| money.value() * BN_USD_PER_MUSD;
        Totals::from_fn(|metric| match metric {
            Metric::PowerProduced => self.total_production.value() * TWH_PER_GWH,
            Metric::SystemLcoe => self.lcoe().usd_per_mwh(),
            Metric::TotalCost => bn_usd(self.total_cost()),
            Metric::Construction => bn_usd(self.total_investment),
            Metric::FuelCost => bn_usd(self.total_fuel_cost),
            Metric::OperatingCost => {
                bn_usd(self.total_fixed_om_cost + self.total_variable_om_cost)
            }
            Metric::SalvageValue => -bn_usd(self.total_salvage_value),
            Metric::Emissions => self.total_emissions.value() * GT_PER_KT,
            Metric::Capture => self.total_capture.value() * GT_PER_KT,
            Metric::ExternalCost => bn_usd(self.total_external_cost),
            Metric::CostWithExternal => {
                bn_usd(self.total_cost() + self.total_external_cost)
            }
        })
    }

    /// Cumulative emissions by source over the horizon (MtCO2eq)
    pub fn emission_sum(&self) -> CategoryValues {
        scale_values(&self.emissions.column_sums(), MT_PER_KT)
    }

    /// Average carbon intensity of production (gCO2eq/kWh) at the ends of the axis and 2030
    pub fn carbon_intensity(&self) -> Result<Vec<(u32, f64)>> {
        let axis = self.plan.axis();
        let years = axis.filter_years(
            [axis.start(), axis.end()]
                .into_iter()
                .chain(CARBON_INTENSITY_KEY_YEARS),
        );
        years
            .into_iter()
            .map(|year| -> Result<_> {
                let emissions = self.total_emissions_by_year.get(year)?;
                let production = self.plan.total_production().get(year)?;
                Ok((year, G_PER_KWH_PER_KT_PER_GWH * emissions / production))
            })
            .try_collect()
    }

    /// CO2 captured (MtCO2) in key years
    pub fn carbon_captured(&self) -> Result<Vec<(u32, f64)>> {
        let years = self.plan.axis().filter_years(CARBON_CAPTURED_KEY_YEARS);
        years
            .into_iter()
            .map(|year| -> Result<_> {
                Ok((year, self.total_capture_by_year.get(year)? * MT_PER_KT))
            })
            .try_collect()
    }

    /// The headline figures as a table
    pub fn totals_table(&self) -> TextTable {
        let mut table = TextTable::new(["", self.signature.as_str(), "Unit"]);
        for (metric, value) in self.total().iter() {
            table.push_row([
                metric.to_string(),
                format_value(value, metric.precision()),
                metric.unit().to_string(),
            ]);
        }

        table
    }

    /// Short text summary
    pub fn summary(&self) -> String {
        let cents_per_kwh = self.lcoe().usd_per_mwh() / 10.0;
        format!(
            "{self} - Summary\n\n{}\n{}\n\
            System LCOE: {cents_per_kwh:.2} US cent/kWh\n\
            CO2 emissions: {:.1} GtCO2eq\n\
            CO2 capture: {:.1} GtCO2",
            self.plan,
            self.parameter,
            self.total_emissions.value() * GT_PER_KT,
            self.total_capture.value() * GT_PER_KT,
        )
    }

    /// Every result table, for every year
    pub fn detailed_report(&self) -> Result<String> {
        let years = self.plan.axis().years().collect_vec();
        let fuel_columns = fuels().collect_vec();
        let source_columns = sources().collect_vec();
        let ccs_columns = ccs().collect_vec();

        let with_total = |table: &YearTable, columns: &[Source], total: &Series| {
            let mut text = TextTable::from_year_table(table, columns, &years, 0)?;
            text.push_column(
                "Total",
                total.values().iter().map(|v| format_value(*v, 0)).collect_vec(),
            );
            Ok::<_, anyhow::Error>(text)
        };

        Ok(format!(
            "{self} - Detailed results tables\n\n\
            Construction costs (MUSD)\n{}\n\
            Fixed operating costs (MUSD)\n{}\n\
            Variable operating costs (MUSD)\n{}\n\
            Heat used (TBtu)\n{}\n\
            Fuel costs (MUSD)\n{}\n\
            GHG emissions (ktCO2eq including CO2, CH4 and N2O)\n{}\n\
            CO2 capture (ktCO2)\n{}",
            TextTable::from_year_table(&self.investment, &fuel_columns, &years, 0)?,
            TextTable::from_year_table(&self.fixed_om_cost, &fuel_columns, &years, 0)?,
            TextTable::from_year_table(&self.variable_om_cost, &source_columns, &years, 0)?,
            TextTable::from_year_table(&self.heat_used, &source_columns, &years, 0)?,
            TextTable::from_year_table(&self.fuel_cost, &source_columns, &years, 0)?,
            with_total(
                &self.emissions,
                &source_columns,
                &self.total_emissions_by_year
            )?,
            with_total(&self.capture, &ccs_columns, &self.total_capture_by_year)?,
        ))
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}
