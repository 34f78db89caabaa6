//! Sensitivity analysis: one plan comparison repeated across variants of the parameters.
use crate::finance::discount_series;
use crate::pair::RunPair;
use crate::parameter::{CostAttribute, Parameter};
use crate::plan::Plan;
use crate::report::{TextTable, format_value};
use crate::run::Metric;
use crate::source::{Source, ccs};
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use std::sync::Arc;

/// Yearly decline of coal and gas prices in the low fuel price variant
const FUEL_PRICE_DECLINE: f64 = 0.03;

/// Yearly decline of CCS costs in the low CCS cost variant
const CCS_COST_DECLINE: f64 = 0.018;

/// Multiplier on the carbon price in the high carbon price variant
const HIGH_CARBON_PRICE_FACTOR: f64 = 1.75;

/// An ordered collection of parameter variants
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<Parameter>,
}

impl Ensemble {
    /// Create an ensemble from its members, in reporting order
    pub fn new(members: Vec<Parameter>) -> Self {
        Self { members }
    }

    /// The standard one-factor-at-a-time variants of `reference`, starting with `reference`
    pub fn sensitivity(reference: &Parameter) -> Result<Self> {
        let axis = reference.axis();

        let high_discount = reference
            .with_discount_rate(Dimensionless(0.08))?
            .with_description("Discount 8%");
        let low_discount = reference
            .with_discount_rate(Dimensionless(0.04))?
            .with_description("Discount 4%");
        let high_carbon_price = reference
            .with_scaled_carbon_price(HIGH_CARBON_PRICE_FACTOR)?
            .with_description("175% carbon price");

        let fuel_trend = discount_series(Dimensionless(FUEL_PRICE_DECLINE), axis)?;
        let mut low_fuel_price = reference.clone();
        for fuel in [Source::Coal, Source::Gas] {
            low_fuel_price =
                low_fuel_price.with_column_scaled(CostAttribute::HeatPrice, fuel, &fuel_trend)?;
        }
        let low_fuel_price =
            low_fuel_price.with_description("Coal and Gas price fall by 3% per year");

        let ccs_trend = discount_series(Dimensionless(CCS_COST_DECLINE), axis)?;
        let mut low_ccs_cost = reference.clone();
        for technology in ccs() {
            for attribute in [
                CostAttribute::ConstructionCost,
                CostAttribute::FixedOperatingCost,
                CostAttribute::VariableOperatingCost,
            ] {
                low_ccs_cost = low_ccs_cost.with_column_scaled(attribute, technology, &ccs_trend)?;
            }
        }
        let low_ccs_cost =
            low_ccs_cost.with_description("CCS construction and OM costs fall by 1.8% per year");

        Ok(Self::new(vec![
            reference.clone(),
            high_discount,
            low_discount,
            high_carbon_price,
            low_fuel_price,
            low_ccs_cost,
        ]))
    }

    /// The parameter variants, in order
    pub fn members(&self) -> &[Parameter] {
        &self.members
    }

    /// The number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Compare `bau` and `alt` with each member.
    ///
    /// Members are evaluated in parallel; the results are in member order.
    pub fn evaluate(&self, bau: &Arc<Plan>, alt: &Arc<Plan>) -> Result<Vec<RunPair>> {
        info!("Evaluating {} parameter variants", self.members.len());
        self.members
            .par_iter()
            .map(|parameter| {
                RunPair::new(bau, alt, parameter)
                    .with_context(|| format!("Failed to evaluate with {parameter}"))
            })
            .collect()
    }
}

/// One line per ensemble member: the carbon value and the cost and emission differences
pub fn summary_table(pairs: &[RunPair]) -> TextTable {
    let mut table = TextTable::new([
        "Parameters",
        "Carbon value (USD/tCO2eq)",
        "Δ Total cost (bn USD)",
        "Δ CO2 emissions (GtCO2eq)",
    ]);
    for pair in pairs {
        let difference = pair.alt().total().difference(&pair.bau().total());
        table.push_row([
            pair.parameter().description().to_string(),
            format_value(pair.carbon_value(), 1),
            format_value(difference.get(Metric::TotalCost), 1),
            format_value(difference.get(Metric::Emissions), 2),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{parameter, plan};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    #[rstest]
    fn test_sensitivity_members(parameter: Parameter) {
        let ensemble = Ensemble::sensitivity(&parameter).unwrap();
        assert_eq!(ensemble.len(), 6);
        assert_eq!(ensemble.members()[0], parameter);
        assert_eq!(
            ensemble
                .members()
                .iter()
                .map(Parameter::description)
                .collect_vec(),
            [
                "Test parameters",
                "Discount 8%",
                "Discount 4%",
                "175% carbon price",
                "Coal and Gas price fall by 3% per year",
                "CCS construction and OM costs fall by 1.8% per year",
            ]
        );

        // Every variant is distinguishable
        let digests = ensemble.members().iter().map(Parameter::digest).unique();
        assert_eq!(digests.count(), 6);
    }

    #[rstest]
    fn test_sensitivity_overrides(parameter: Parameter) {
        let ensemble = Ensemble::sensitivity(&parameter).unwrap();
        let members = ensemble.members();
        assert_eq!(members[1].discount_rate(), Dimensionless(0.08));
        assert_eq!(members[2].discount_rate(), Dimensionless(0.04));
        assert_approx_eq!(
            f64,
            members[3].carbon_price().get(2020).unwrap(),
            40.0 * 1.75
        );

        // Third year: two years of decline
        let coal_price = members[4].heat_price().get(2018, Source::Coal).unwrap();
        let reference = parameter.heat_price().get(2018, Source::Coal).unwrap();
        assert_approx_eq!(f64, coal_price, reference / 1.03_f64.powi(2));
        assert_eq!(
            members[4].heat_price().get(2018, Source::Oil).unwrap(),
            parameter.heat_price().get(2018, Source::Oil).unwrap()
        );

        let ccs_cost = members[5]
            .construction_cost()
            .get(2017, Source::GasCCS)
            .unwrap();
        let reference = parameter.construction_cost().get(2017, Source::GasCCS).unwrap();
        assert_approx_eq!(f64, ccs_cost, reference / 1.018);

        // The reference is never modified
        assert_eq!(members[0], parameter);
    }

    #[rstest]
    fn test_evaluate_in_order(plan: Plan, parameter: Parameter) {
        let ensemble = Ensemble::sensitivity(&parameter).unwrap();
        let plan = Arc::new(plan);
        let pairs = ensemble.evaluate(&plan, &plan).unwrap();
        assert_eq!(pairs.len(), ensemble.len());
        for (pair, member) in pairs.iter().zip(ensemble.members()) {
            assert_eq!(pair.parameter(), member);
        }

        // A lower discount rate weighs later production more heavily
        let production = |i: usize| pairs[i].bau().total().get(Metric::PowerProduced);
        assert!(production(2) > production(0));
        assert!(production(1) < production(0));
    }

    #[rstest]
    fn test_summary_table(plan: Plan, parameter: Parameter) {
        let plan = Arc::new(plan);
        let pairs = Ensemble::new(vec![parameter])
            .evaluate(&plan, &plan)
            .unwrap();
        let table = summary_table(&pairs);
        assert_eq!(table.len(), 1);
        assert!(table.to_string().contains("Test parameters"));
    }
}
