//! Comparison of two plans evaluated in the same environment.
use crate::parameter::Parameter;
use crate::plan::Plan;
use crate::report::{TextTable, format_value};
use crate::run::{Metric, Run};
use crate::source::Source;
use anyhow::{Result, ensure};
use itertools::Itertools;
use log::warn;
use std::fmt;
use std::sync::Arc;

/// One row of a [`Comparison`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow<K> {
    /// What the row is about (a metric, a source or a year)
    pub key: K,
    /// The value for the baseline
    pub bau: f64,
    /// The value for the alternative
    pub alt: f64,
    /// `alt - bau`
    pub difference: f64,
}

/// Values for the baseline and the alternative side by side, with their difference
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<K> {
    rows: Vec<ComparisonRow<K>>,
}

impl<K: Copy + PartialEq> Comparison<K> {
    /// Pair up rows with matching keys. The keys must be the same, in the same order.
    pub fn new<I, J>(bau: I, alt: J) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        J: IntoIterator<Item = (K, f64)>,
    {
        let bau = bau.into_iter().collect_vec();
        let alt = alt.into_iter().collect_vec();
        ensure!(
            bau.len() == alt.len() && bau.iter().zip(&alt).all(|(b, a)| b.0 == a.0),
            "Cannot compare results with different rows"
        );
        let rows = bau
            .into_iter()
            .zip(alt)
            .map(|((key, bau), (_, alt))| ComparisonRow {
                key,
                bau,
                alt,
                difference: alt - bau,
            })
            .collect();

        Ok(Self { rows })
    }

    /// The rows, in order
    pub fn rows(&self) -> &[ComparisonRow<K>] {
        &self.rows
    }

    /// The row for `key`, if any
    pub fn row(&self, key: K) -> Option<&ComparisonRow<K>> {
        self.rows.iter().find(|row| row.key == key)
    }
}

impl<K: fmt::Display> Comparison<K> {
    /// Render as a text table with the given column headers for BAU, ALT and the difference
    pub fn to_text_table(&self, headers: [&str; 3], precision: usize) -> TextTable {
        let mut table = TextTable::new(std::iter::once("").chain(headers));
        for row in &self.rows {
            table.push_row([
                row.key.to_string(),
                format_value(row.bau, precision),
                format_value(row.alt, precision),
                format_value(row.difference, precision),
            ]);
        }

        table
    }
}

/// Two plans evaluated with the same parameters
#[derive(Debug, Clone)]
pub struct RunPair {
    bau: Run,
    alt: Run,
}

impl RunPair {
    /// Evaluate the baseline and alternative plans with `parameter`
    pub fn new(bau: &Arc<Plan>, alt: &Arc<Plan>, parameter: &Parameter) -> Result<Self> {
        Ok(Self {
            bau: Run::new(bau, parameter)?,
            alt: Run::new(alt, parameter)?,
        })
    }

    /// The baseline run
    pub fn bau(&self) -> &Run {
        &self.bau
    }

    /// The alternative run
    pub fn alt(&self) -> &Run {
        &self.alt
    }

    /// The parameters both runs share
    pub fn parameter(&self) -> &Parameter {
        self.bau.parameter()
    }

    /// The headline figures of both runs and `alt - bau`
    pub fn total(&self) -> Comparison<Metric> {
        let bau = self.bau.total();
        let alt = self.alt.total();
        let difference = alt.difference(&bau);
        let rows = bau
            .iter()
            .zip(alt.iter())
            .map(|((key, bau), (_, alt))| ComparisonRow {
                key,
                bau,
                alt,
                difference: difference.get(key),
            })
            .collect();

        Comparison { rows }
    }

    /// Cumulative emissions by source (MtCO2eq)
    pub fn emission_sum(&self) -> Result<Comparison<Source>> {
        Comparison::new(self.bau.emission_sum().iter(), self.alt.emission_sum().iter())
    }

    /// Average carbon intensity of production (gCO2eq/kWh) in key years
    pub fn carbon_intensity(&self) -> Result<Comparison<u32>> {
        Comparison::new(self.bau.carbon_intensity()?, self.alt.carbon_intensity()?)
    }

    /// CO2 captured (MtCO2) in key years
    pub fn carbon_captured(&self) -> Result<Comparison<u32>> {
        Comparison::new(self.bau.carbon_captured()?, self.alt.carbon_captured()?)
    }

    /// The present value cost of avoided emissions (USD/tCO2eq).
    ///
    /// Positive when the alternative costs more and emits less. Not finite if both plans emit the
    /// same amount.
    pub fn carbon_value(&self) -> f64 {
        let difference = self.alt.total().difference(&self.bau.total());
        let avoided = -difference.get(Metric::Emissions);
        if avoided == 0.0 {
            warn!(
                "{} and {} have the same emissions, so the carbon value is undefined",
                self.bau, self.alt
            );
        }

        // bn USD / GtCO2eq = USD/tCO2eq
        difference.get(Metric::TotalCost) / avoided
    }

    /// The headline figures with their units
    pub fn totals_table(&self, headers: [&str; 3]) -> TextTable {
        let total = self.total();
        let mut table = TextTable::new(std::iter::once("").chain(headers).chain(["Unit"]));
        for row in total.rows() {
            let precision = row.key.precision();
            table.push_row([
                row.key.to_string(),
                format_value(row.bau, precision),
                format_value(row.alt, precision),
                format_value(row.difference, precision),
                row.key.unit().to_string(),
            ]);
        }

        table
    }

    /// The comparison report
    pub fn summary(&self, headers: [&str; 3]) -> Result<String> {
        Ok(format!(
            "{self}\n\n\
            Present value cost of avoided emissions: {:.1} USD/tCO2eq\n\n\
            {}\n\
            Emissions by source (MtCO2eq)\n{}\n\
            Average Carbon Intensity (g/kWh)\n{}\n\
            Carbon Captured (Mt)\n{}",
            self.carbon_value(),
            self.totals_table(headers),
            self.emission_sum()?.to_text_table(headers, 0),
            self.carbon_intensity()?.to_text_table(headers, 0),
            self.carbon_captured()?.to_text_table(headers, 1),
        ))
    }
}

impl fmt::Display for RunPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\nBAU = {}\nALT = {}",
            self.parameter(),
            self.bau.plan(),
            self.alt.plan()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, parameter, plan};
    use crate::run::Totals;
    use crate::source::fuels;
    use crate::table::YearTable;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use strum::EnumCount;

    /// The test plan, with 100 MW a year of coal replaced by wind
    fn greener(plan: &Plan) -> Plan {
        let mut additions = plan.additions().clone();
        additions.update_column(Source::Coal, |_, value| *value = 0.0);
        additions.update_column(Source::Wind, |_, value| *value += 100.0);
        let retirement = YearTable::zeros(plan.axis(), fuels());
        plan.variant("Greener", &additions, &retirement).unwrap()
    }

    /// Check that the difference column is exactly `alt - bau`
    fn assert_consistent(totals: &Comparison<Metric>, bau: &Totals, alt: &Totals) {
        for row in totals.rows() {
            assert_eq!(row.bau, bau.get(row.key));
            assert_eq!(row.alt, alt.get(row.key));
            assert_eq!(row.difference, alt.get(row.key) - bau.get(row.key));
        }
    }

    #[fixture]
    fn pair(plan: Plan, parameter: Parameter) -> RunPair {
        let alt = greener(&plan);
        RunPair::new(&Arc::new(plan), &Arc::new(alt), &parameter).unwrap()
    }

    #[rstest]
    fn test_total_difference(pair: RunPair) {
        let totals = pair.total();
        assert_eq!(totals.rows().len(), Metric::COUNT);
        assert_consistent(&totals, &pair.bau().total(), &pair.alt().total());
    }

    #[rstest]
    fn test_carbon_value(pair: RunPair) {
        let difference = pair.alt().total().difference(&pair.bau().total());

        // Replacing coal with wind cuts emissions
        assert!(difference.get(Metric::Emissions) < 0.0);
        assert_approx_eq!(
            f64,
            pair.carbon_value(),
            -difference.get(Metric::TotalCost) / difference.get(Metric::Emissions)
        );
    }

    #[rstest]
    fn test_carbon_value_same_plan(plan: Plan, parameter: Parameter) {
        let plan = Arc::new(plan);
        let pair = RunPair::new(&plan, &plan, &parameter).unwrap();
        assert!(!pair.carbon_value().is_finite());
        assert!(
            pair.total()
                .rows()
                .iter()
                .all(|row| row.difference == 0.0)
        );
    }

    #[rstest]
    fn test_emission_sum(pair: RunPair) {
        let emission_sum = pair.emission_sum().unwrap();
        let coal = emission_sum.row(Source::Coal).unwrap();
        assert!(coal.difference < 0.0);
        assert!(emission_sum.row(Source::Wind).unwrap().bau > 0.0);
    }

    #[test]
    fn test_comparison_mismatch() {
        assert_error!(
            Comparison::new([(2020, 1.0)], [(2030, 1.0)]),
            "Cannot compare results with different rows"
        );
    }

    #[rstest]
    fn test_summary(pair: RunPair) {
        let summary = pair
            .summary(["Baseline", "Greener", "difference"])
            .unwrap();
        assert!(summary.starts_with(&pair.parameter().to_string()));
        assert!(summary.contains("BAU = Power development program #"));
        assert!(summary.contains("Present value cost of avoided emissions"));
        assert!(summary.contains("Average Carbon Intensity (g/kWh)"));
    }
}
