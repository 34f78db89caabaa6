//! General functions related to finance: discounting of time series to present value.
//!
//! The discount factor for year index `i` (counted from the start of the year axis) is
//! `(1 + rate)^(-i)`. Discount vectors are memoised in a process-wide cache, as the same rate is
//! applied to many series within a run and across an ensemble.
use crate::table::{CategoryValues, Series, YearTable};
use crate::units::Dimensionless;
use crate::year::YearAxis;
use anyhow::{Context, Result, ensure};
use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

/// The process-wide discount vector cache
static DISCOUNT_CACHE: LazyLock<DiscountCache> = LazyLock::new(DiscountCache::default);

/// Check that a discount rate can be used for discounting
pub fn check_discount_rate(rate: Dimensionless) -> Result<()> {
    ensure!(
        rate.is_finite() && rate > Dimensionless(-1.0),
        "Discount rate must be a finite number greater than -1 (got {rate})"
    );

    Ok(())
}

/// Compute the discount factors for `rate` over `horizon_length` years
fn compute_discount_vector(rate: Dimensionless, horizon_length: usize) -> Arc<[f64]> {
    let base = 1.0 / (1.0 + rate.0);
    let mut factor = 1.0;
    (0..horizon_length)
        .map(|_| {
            let current = factor;
            factor *= base;
            current
        })
        .collect()
}

/// A memo of discount vectors, keyed by rate and horizon length.
///
/// Entries are never removed or replaced, so a vector obtained from the cache is bit-identical to
/// any later one for the same key. The map is guarded by a lock so the cache can be shared between
/// threads evaluating runs in parallel.
#[derive(Debug, Default)]
pub struct DiscountCache {
    vectors: Mutex<HashMap<(u64, usize), Arc<[f64]>>>,
}

impl DiscountCache {
    /// Get the discount vector for `rate` over `horizon_length` years, computing it if needed
    pub fn get(&self, rate: Dimensionless, horizon_length: usize) -> Result<Arc<[f64]>> {
        check_discount_rate(rate)?;

        // Normalise -0.0 so that it shares an entry with 0.0
        let rate = if rate.0 == 0.0 { Dimensionless(0.0) } else { rate };
        let key = (rate.0.to_bits(), horizon_length);

        // A poisoned lock can't leave a partially written entry, so the map is still usable
        let mut vectors = self.vectors.lock().unwrap_or_else(PoisonError::into_inner);
        let vector = vectors.entry(key).or_insert_with(|| {
            trace!("Computing discount vector (rate: {rate}, years: {horizon_length})");
            compute_discount_vector(rate, horizon_length)
        });

        Ok(Arc::clone(vector))
    }

    /// The number of cached vectors
    pub fn len(&self) -> usize {
        self.vectors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A vector `v` such that the scalar product of a series with `v` is its present value.
///
/// Element `i` equals `(1 + rate)^(-i)`.
pub fn discount_vector(rate: Dimensionless, horizon_length: usize) -> Result<Arc<[f64]>> {
    DISCOUNT_CACHE.get(rate, horizon_length)
}

/// The discount factors for `rate` as a [`Series`] on `axis`.
///
/// Also useful as a trend: multiplying a price series by this series makes it fall by `rate` per
/// year.
pub fn discount_series(rate: Dimensionless, axis: YearAxis) -> Result<Series> {
    let vector = discount_vector(rate, axis.len())?;
    Series::new(axis, vector.to_vec())
}

/// Intertemporal total present value of a series.
pub fn present_value(series: &Series, rate: Dimensionless) -> Result<f64> {
    let factors = discount_vector(rate, series.axis().len())?;
    Ok(series
        .values()
        .iter()
        .zip(factors.iter())
        .map(|(value, factor)| value * factor)
        .sum())
}

/// Present value of each column of a table, summing over years only.
pub fn present_value_table(table: &YearTable, rate: Dimensionless) -> Result<CategoryValues> {
    let factors = discount_vector(rate, table.axis().len())?;
    Ok(table
        .iter_columns()
        .map(|(category, values)| {
            let pv = values
                .iter()
                .zip(factors.iter())
                .map(|(value, factor)| value * factor)
                .sum();
            (category, pv)
        })
        .collect())
}

/// Return the present value of a one-off cash flow occurring in `year`.
pub fn discount(value: f64, year: u32, axis: YearAxis, rate: Dimensionless) -> Result<f64> {
    let index = axis
        .index_of(year)
        .context("Cannot discount a value outside the model horizon")?;
    let factors = discount_vector(rate, axis.len())?;
    Ok(value * factors[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::source::Source;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_discount_vector_zero_rate() {
        let vector = discount_vector(Dimensionless(0.0), 35).unwrap();
        assert_eq!(vector.len(), 35);
        assert!(vector.iter().all(|x| *x == 1.0));
    }

    #[rstest]
    #[case(0.05, 1, 0.9523809523809523)]
    #[case(0.05, 2, 0.9070294784580498)]
    #[case(0.1, 3, 0.7513148009015775)]
    #[case(-0.5, 1, 2.0)]
    fn test_discount_vector_elements(
        #[case] rate: f64,
        #[case] index: usize,
        #[case] expected: f64,
    ) {
        let vector = discount_vector(Dimensionless(rate), 10).unwrap();
        assert_eq!(vector[0], 1.0);
        assert_approx_eq!(f64, vector[index], expected, epsilon = 1e-12);
        assert_approx_eq!(
            f64,
            vector[index],
            (1.0 + rate).powi(-(index as i32)),
            epsilon = 1e-12
        );
    }

    #[rstest]
    #[case(-1.0)]
    #[case(-2.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_discount_vector_invalid_rate(#[case] rate: f64) {
        assert!(discount_vector(Dimensionless(rate), 10).is_err());
    }

    #[test]
    fn test_cache_returns_identical_vectors() {
        let cache = DiscountCache::default();
        assert!(cache.is_empty());
        let a = cache.get(Dimensionless(0.06), 35).unwrap();
        let b = cache.get(Dimensionless(0.06), 35).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        // Different horizon is a different entry
        cache.get(Dimensionless(0.06), 10).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_order_independent() {
        let first = DiscountCache::default();
        let a1 = first.get(Dimensionless(0.04), 35).unwrap();
        let b1 = first.get(Dimensionless(0.08), 35).unwrap();

        let second = DiscountCache::default();
        let b2 = second.get(Dimensionless(0.08), 35).unwrap();
        let a2 = second.get(Dimensionless(0.04), 35).unwrap();

        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_present_value_zero_rate_is_sum() {
        let axis = YearAxis::new(2016, 2025).unwrap();
        let series = Series::from_fn(axis, |year| f64::from(year - 2000));
        assert_approx_eq!(
            f64,
            present_value(&series, Dimensionless(0.0)).unwrap(),
            series.sum()
        );
    }

    #[test]
    fn test_present_value_geometric_sum() {
        let axis = YearAxis::new(2016, 2025).unwrap();
        let series = Series::constant(axis, 100.0);
        let expected: f64 = (0..10).map(|i| 100.0 * 1.05f64.powi(-i)).sum();
        assert_approx_eq!(
            f64,
            present_value(&series, Dimensionless(0.05)).unwrap(),
            expected,
            epsilon = 1e-9
        );

        // Closed form of the geometric series
        let closed_form = 100.0 * (1.0 - 1.05f64.powi(-10)) / (1.0 - 1.0 / 1.05);
        assert_approx_eq!(f64, expected, closed_form, epsilon = 1e-9);
    }

    #[test]
    fn test_present_value_table_keeps_categories() {
        let axis = YearAxis::new(2016, 2018).unwrap();
        let table = YearTable::new(
            axis,
            [
                (Source::Coal, vec![100.0, 100.0, 100.0]),
                (Source::Wind, vec![0.0, 0.0, 121.0]),
            ],
        )
        .unwrap();
        let pv = present_value_table(&table, Dimensionless(0.1)).unwrap();
        assert_approx_eq!(
            f64,
            pv.get(Source::Coal).unwrap(),
            100.0 + 100.0 / 1.1 + 100.0 / 1.21,
            epsilon = 1e-9
        );
        assert_approx_eq!(f64, pv.get(Source::Wind).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_discount_single_value() {
        let axis = YearAxis::new(2016, 2050).unwrap();
        let value = discount(1000.0, 2050, axis, Dimensionless(0.06)).unwrap();
        assert_approx_eq!(f64, value, 1000.0 * 1.06f64.powi(-34), epsilon = 1e-9);
        assert_eq!(discount(5.0, 2016, axis, Dimensionless(0.06)).unwrap(), 5.0);
    }

    #[test]
    fn test_discount_off_axis() {
        let axis = YearAxis::new(2016, 2050).unwrap();
        assert_error!(
            discount(1.0, 2051, axis, Dimensionless(0.06)),
            "Cannot discount a value outside the model horizon"
        );
    }

    #[test]
    fn test_discount_series_trend() {
        let axis = YearAxis::new(2016, 2018).unwrap();
        let trend = discount_series(Dimensionless(0.03), axis).unwrap();
        assert_eq!(trend.get(2016).unwrap(), 1.0);
        assert_approx_eq!(f64, trend.get(2018).unwrap(), 1.03f64.powi(-2), epsilon = 1e-12);
    }
}
