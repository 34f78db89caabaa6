//! Residual value of capacity still within its accounting life at the end of the model horizon.
use crate::source::Source;
use crate::table::{Series, YearTable};
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Plant accounting life in years, for each category
pub type PlantLifeMap = IndexMap<Source, u32>;

/// The fraction of a plant's value remaining at `age` years after it was commissioned.
///
/// Plants are commissioned mid-year on average, hence the half-year offset. Returns zero once the
/// plant has reached the end of its accounting life (or if the life is zero).
pub fn remaining_fraction(age: u32, life: u32) -> f64 {
    if age >= life {
        return 0.0;
    }

    1.0 - (f64::from(age) + 0.5) / f64::from(life)
}

/// The undepreciated value of a series of capacity additions, booked at the last year of the axis.
///
/// The result is zero in every year except the last, where it holds the sum over vintages of the
/// remaining fraction times the amount added in that vintage.
pub fn residual_value(additions: &Series, life: u32) -> Series {
    let axis = additions.axis();
    let end_year = axis.end();
    let total: f64 = additions
        .iter()
        .map(|(vintage, added)| added * remaining_fraction(end_year - vintage, life))
        .sum();

    Series::from_fn(axis, |year| if year == end_year { total } else { 0.0 })
}

/// The residual value table for every column of `value_added`.
///
/// `value_added` holds the capacity added in each year, so the result is the undepreciated share
/// of those additions. Every column must have an entry in `plant_life`.
pub fn salvage_table(value_added: &YearTable, plant_life: &PlantLifeMap) -> Result<YearTable> {
    let mut columns = Vec::new();
    for category in value_added.categories() {
        let life = *plant_life
            .get(&category)
            .with_context(|| format!("No plant accounting life for {category}"))?;
        let residual = residual_value(&value_added.column_series(category)?, life);
        columns.push((category, residual.values().to_vec()));
    }

    YearTable::new(value_added.axis(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::year::YearAxis;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// A single addition of `amount` in `vintage`, on an axis ending `k` years later
    fn single_addition(vintage: u32, k: u32, amount: f64) -> Series {
        let axis = YearAxis::new(vintage - 2, vintage + k).unwrap();
        Series::from_fn(axis, |year| if year == vintage { amount } else { 0.0 })
    }

    #[rstest]
    #[case(0, 20)]
    #[case(1, 20)]
    #[case(10, 20)]
    #[case(19, 20)]
    #[case(0, 1)]
    fn test_residual_value_within_life(#[case] k: u32, #[case] life: u32) {
        let additions = single_addition(2030, k, 250.0);
        let residual = residual_value(&additions, life);
        let expected = 250.0 * (1.0 - (f64::from(k) + 0.5) / f64::from(life));
        assert_approx_eq!(f64, residual.get(2030 + k).unwrap(), expected);
    }

    #[rstest]
    #[case(20, 20)]
    #[case(25, 20)]
    #[case(1, 1)]
    fn test_residual_value_after_life(#[case] k: u32, #[case] life: u32) {
        let additions = single_addition(2030, k, 250.0);
        assert_eq!(residual_value(&additions, life).sum(), 0.0);
    }

    #[test]
    fn test_residual_value_zero_life() {
        let additions = single_addition(2030, 3, 250.0);
        let residual = residual_value(&additions, 0);
        assert!(residual.values().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_residual_value_booked_at_end() {
        let axis = YearAxis::new(2016, 2020).unwrap();
        let additions = Series::constant(axis, 10.0);
        let residual = residual_value(&additions, 10);
        assert_eq!(residual.values()[..4], [0.0; 4]);

        // Ages 4, 3, 2, 1, 0
        let expected: f64 = (0..5).map(|age| 10.0 * (1.0 - (f64::from(age) + 0.5) / 10.0)).sum();
        assert_approx_eq!(f64, residual.get(2020).unwrap(), expected);
    }

    #[test]
    fn test_salvage_table_missing_life() {
        let axis = YearAxis::new(2016, 2020).unwrap();
        let table = YearTable::zeros(axis, [Source::Coal, Source::Wind]);
        let plant_life = PlantLifeMap::from([(Source::Coal, 40)]);
        assert_error!(
            salvage_table(&table, &plant_life),
            "No plant accounting life for Wind"
        );
    }
}
