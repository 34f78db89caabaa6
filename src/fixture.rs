//! Fixtures for tests

use crate::parameter::{Parameter, ParameterInputs};
use crate::plan::Plan;
use crate::salvage::PlantLifeMap;
use crate::source::{Source, fuels, sources};
use crate::table::{CategoryValues, Series, YearTable};
use crate::units::Dimensionless;
use crate::year::YearAxis;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A table with one column per category, each value computed from the year and category
fn table_from_fn<I, F>(axis: YearAxis, categories: I, mut f: F) -> YearTable
where
    I: IntoIterator<Item = Source>,
    F: FnMut(u32, Source) -> f64,
{
    YearTable::new(
        axis,
        categories
            .into_iter()
            .map(|c| (c, axis.years().map(|year| f(year, c)).collect())),
    )
    .unwrap()
}

#[fixture]
pub fn axis() -> YearAxis {
    YearAxis::new(2016, 2020).unwrap()
}

#[fixture]
pub fn plan(axis: YearAxis) -> Plan {
    let additions = table_from_fn(axis, fuels(), |_, c| match c {
        Source::Coal => 100.0,
        Source::Gas => 200.0,
        Source::Wind => 50.0,
        Source::Solar => 30.0,
        _ => 0.0,
    });
    let retirement = table_from_fn(axis, fuels(), |year, c| {
        if c == Source::Coal && year == 2020 {
            20.0
        } else {
            0.0
        }
    });
    let capacity_factor = table_from_fn(axis, fuels(), |_, c| match c {
        Source::Wind => 0.3,
        Source::Solar => 0.2,
        _ => 0.5,
    });

    Plan::new(
        "Test plan",
        axis,
        &additions,
        &retirement,
        &capacity_factor,
        &Series::constant(axis, 1000.0),
        &CategoryValues::default(),
    )
    .unwrap()
}

#[fixture]
pub fn parameter_inputs(axis: YearAxis) -> ParameterInputs {
    let start = axis.start();
    let falling = move |year: u32, base: f64| base * (1.0 - 0.01 * f64::from(year - start));

    ParameterInputs {
        description: "Test parameters".into(),
        discount_rate: Dimensionless(0.06),
        plant_accounting_life: fuels().map(|f| (f, 30)).collect::<PlantLifeMap>(),
        construction_cost: table_from_fn(axis, fuels(), |year, c| {
            falling(year, if c.is_ccs() { 3000.0 } else { 1500.0 })
        }),
        fixed_operating_cost: table_from_fn(axis, fuels(), |year, _| falling(year, 40.0)),
        variable_operating_cost: table_from_fn(axis, sources(), |_, c| {
            if c == Source::Import { 70.0 } else { 4.0 }
        }),
        heat_rate: table_from_fn(axis, sources().filter(|s| s.is_combustion()), |_, c| {
            if c.is_ccs() { 12000.0 } else { 9000.0 }
        }),
        heat_price: table_from_fn(axis, sources().filter(|s| s.is_combustion()), |year, _| {
            falling(year, 5.0)
        }),
        emission_factor: sources()
            .map(|s| {
                let factor = match s {
                    Source::Coal => 900.0,
                    Source::Gas => 450.0,
                    Source::Oil => 750.0,
                    Source::CoalCCS => 150.0,
                    Source::GasCCS => 80.0,
                    Source::Import => 500.0,
                    _ => 20.0,
                };
                (s, factor)
            })
            .collect(),
        capture_factor: table_from_fn(axis, sources().filter(|s| s.is_ccs()), |_, _| 800.0),
        carbon_price: Series::from_fn(axis, |year| 10.0 * f64::from(year - start)),
    }
}

#[fixture]
pub fn parameter(parameter_inputs: ParameterInputs) -> Parameter {
    Parameter::new(parameter_inputs).unwrap()
}
