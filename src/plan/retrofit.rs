//! A scenario transform which converts a baseline plan into one with carbon capture and storage.
//!
//! Gas-fired pilot plants are fitted with capture first. From `retrofit_start_year` onwards, the
//! coal and gas fleets in service at the end of the horizon are retrofitted at a constant rate,
//! new gas plants are built with capture, and a linearly growing amount of biomass with capture
//! is installed. Gas CCS additions are reduced so that end-year generation is unchanged.
use super::Plan;
use crate::source::Source;
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use log::debug;
use serde::Deserialize;

/// A gas-fired CCS pilot plant
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Pilot {
    /// The year in which the pilot is built
    pub year: u32,
    /// The capacity of the pilot (MW)
    pub size: f64,
}

fn default_pilots() -> Vec<Pilot> {
    vec![
        Pilot {
            year: 2024,
            size: 250.0,
        },
        Pilot {
            year: 2029,
            size: 750.0,
        },
    ]
}

fn default_retrofit_start_year() -> u32 {
    2035
}

fn default_bioccs_trend() -> f64 {
    10.0
}

fn default_description() -> String {
    "With CCS".into()
}

/// Options for converting a plan to one with CCS
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CcsRetrofit {
    /// Description given to the new plan
    #[serde(default = "default_description")]
    pub description: String,
    /// Gas-fired pilot plants built with capture
    #[serde(default = "default_pilots")]
    pub pilots: Vec<Pilot>,
    /// The first year of the retrofit period, which runs to the end of the horizon
    #[serde(default = "default_retrofit_start_year")]
    pub retrofit_start_year: u32,
    /// Yearly increase in BioCCS capacity added (MW/yr)
    #[serde(default = "default_bioccs_trend")]
    pub bioccs_trend: f64,
}

impl Default for CcsRetrofit {
    fn default() -> Self {
        Self {
            description: default_description(),
            pilots: default_pilots(),
            retrofit_start_year: default_retrofit_start_year(),
            bioccs_trend: default_bioccs_trend(),
        }
    }
}

impl CcsRetrofit {
    /// Check that the options are consistent with a year axis
    pub fn validate(&self, axis: YearAxis) -> Result<()> {
        axis.index_of(self.retrofit_start_year)
            .context("Invalid retrofit_start_year")?;
        for pilot in &self.pilots {
            axis.index_of(pilot.year)
                .context("Invalid year for CCS pilot")?;
            ensure!(
                pilot.year < self.retrofit_start_year,
                "CCS pilot in {} must be built before the retrofit period starts ({})",
                pilot.year,
                self.retrofit_start_year
            );
            ensure!(
                pilot.size.is_finite() && pilot.size > 0.0,
                "CCS pilot size must be a finite, positive number (got {})",
                pilot.size
            );
        }
        ensure!(
            self.bioccs_trend.is_finite() && self.bioccs_trend >= 0.0,
            "bioccs_trend must be a finite, non-negative number"
        );

        Ok(())
    }

    /// Build the CCS variant of `baseline`
    pub fn apply(&self, baseline: &Plan) -> Result<Plan> {
        let axis = baseline.axis();
        self.validate(axis)?;

        let end_year = axis.end();
        let start = self.retrofit_start_year;
        let in_period = |year: u32| year >= start;
        let period_length = f64::from(end_year - start + 1);

        let mut additions = baseline.additions().clone();
        let mut retirement = baseline.retirement().clone();

        // Pilots: capture fitted to gas plants which were going to be built anyway
        for pilot in &self.pilots {
            let gas_added = additions.get(pilot.year, Source::Gas)?;
            ensure!(
                gas_added > pilot.size,
                "Gas additions in {} ({gas_added} MW) are too small for a {} MW CCS pilot",
                pilot.year,
                pilot.size
            );
            additions.update_column(Source::Gas, |year, value| {
                if year == pilot.year {
                    *value -= pilot.size;
                }
            });
            additions.update_column(Source::GasCCS, |year, value| {
                if year == pilot.year {
                    *value += pilot.size;
                }
            });
        }

        // Retrofit the end-year coal fleet
        let coal_rate = baseline.capacities().get(end_year, Source::Coal)? / period_length;
        retirement.update_column(Source::Coal, |year, value| {
            if in_period(year) {
                *value += coal_rate;
            }
        });
        additions.update_column(Source::CoalCCS, |year, value| {
            if in_period(year) {
                *value = coal_rate;
            }
        });

        // Retrofit the end-year gas fleet, except pilots and plants built during the period
        let gas_added = additions.column_series(Source::Gas)?;
        let pilot_capacity: f64 = self.pilots.iter().map(|p| p.size).sum();
        let gas_added_in_period: f64 = gas_added
            .iter()
            .filter(|(year, _)| in_period(*year))
            .map(|(_, value)| value)
            .sum();
        let gas_rate = (baseline.capacities().get(end_year, Source::Gas)?
            - pilot_capacity
            - gas_added_in_period)
            / period_length;
        debug!("Retrofit rates: Coal {coal_rate:.1} MW/yr, Gas {gas_rate:.1} MW/yr");
        retirement.update_column(Source::Gas, |year, value| {
            if in_period(year) {
                *value += gas_rate;
            }
        });

        // New gas plants are built with capture
        let gas_values = gas_added.values();
        additions.update_column(Source::GasCCS, |year, value| {
            if in_period(year) {
                *value = gas_rate + gas_values[(year - axis.start()) as usize];
            }
        });
        additions.update_column(Source::Gas, |year, value| {
            if in_period(year) {
                *value = 0.0;
            }
        });

        // Linear ramp of BioCCS, saving on GasCCS to keep end-year generation unchanged
        let capacity_factor = baseline.capacity_factor();
        let bioccs_factor = capacity_factor.get(end_year, Source::BioCCS)?;
        let gasccs_factor = capacity_factor.get(end_year, Source::GasCCS)?;
        ensure!(
            gasccs_factor > 0.0,
            "The capacity factor of {} in {end_year} must be positive",
            Source::GasCCS
        );
        let ramp = |year: u32| f64::from(year - start) * self.bioccs_trend;
        additions.update_column(Source::BioCCS, |year, value| {
            if in_period(year) {
                *value = ramp(year);
            }
        });
        additions.update_column(Source::GasCCS, |year, value| {
            if in_period(year) {
                *value -= ramp(year) * bioccs_factor / gasccs_factor;
            }
        });

        baseline.variant(&self.description, &additions, &retirement)
    }
}
