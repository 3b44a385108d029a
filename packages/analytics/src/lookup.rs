//! Bounded backward search for the nearest earlier period with data.

use std::collections::BTreeMap;

use crime_monitor_crime_models::{CrimeCategory, CrimeRecord, Period};

use crate::stats;

/// Maximum number of months searched backwards (ten years).
pub const DEFAULT_LOOKBACK_HORIZON: usize = 120;

/// Records indexed by period for repeated prior-period lookups.
#[derive(Debug, Clone)]
pub struct PriorPeriodLookup<'a> {
    by_period: BTreeMap<Period, Vec<&'a CrimeRecord>>,
    horizon: usize,
}

impl<'a> PriorPeriodLookup<'a> {
    /// Indexes `records` by period.
    #[must_use]
    pub fn new(records: &[&'a CrimeRecord], horizon: usize) -> Self {
        let mut by_period: BTreeMap<Period, Vec<&'a CrimeRecord>> = BTreeMap::new();
        for record in records {
            by_period.entry(record.period).or_default().push(*record);
        }
        Self { by_period, horizon }
    }

    /// Mean of `category` in the nearest period strictly before `target`
    /// that has at least one record reporting it.
    ///
    /// Steps back one calendar month at a time, at most `horizon` steps.
    #[must_use]
    pub fn nearest_prior_average(&self, category: CrimeCategory, target: Period) -> Option<f64> {
        let mut period = target;
        for _ in 0..self.horizon {
            period = period.previous();
            let Some(records) = self.by_period.get(&period) else {
                continue;
            };
            let values: Vec<f64> = records.iter().filter_map(|r| r.value(category)).collect();
            if let Some(mean) = stats::mean(&values).and_then(stats::finite) {
                return Some(mean);
            }
        }

        log::debug!(
            "No prior value for {category} within {} months of {target}",
            self.horizon
        );
        None
    }
}

/// Convenience wrapper over [`PriorPeriodLookup`] for a single lookup with
/// the default ten-year horizon.
///
/// An out-of-range `month` or `year` has no prior period and yields `None`.
#[must_use]
pub fn find_nearest_prior_average(
    records: &[&CrimeRecord],
    category: CrimeCategory,
    month: u32,
    year: i32,
) -> Option<f64> {
    let target = Period::new(year, month).ok()?;
    PriorPeriodLookup::new(records, DEFAULT_LOOKBACK_HORIZON).nearest_prior_average(category, target)
}

#[cfg(test)]
mod tests {
    use crime_monitor_crime_models::RegionKeys;

    use super::*;

    fn record(year: i32, month: u32, value: Option<f64>) -> CrimeRecord {
        CrimeRecord {
            region: RegionKeys::default(),
            period: Period::new(year, month).unwrap(),
            counts: value
                .map(|v| BTreeMap::from([(CrimeCategory::VehicleRobbery, v)]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn returns_mean_of_previous_month() {
        let records = vec![
            record(2023, 2, Some(10.0)),
            record(2023, 2, Some(20.0)),
            record(2023, 3, Some(99.0)),
        ];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        let value = find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 3, 2023);
        assert!((value.unwrap() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wraps_year_and_skips_gaps() {
        let records = vec![record(2022, 11, Some(7.0)), record(2023, 2, Some(1.0))];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        let value = find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 2, 2023);
        assert!((value.unwrap() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn skips_periods_where_category_is_missing() {
        let records = vec![record(2022, 12, Some(3.0)), record(2023, 1, None)];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        let value = find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 2, 2023);
        assert!((value.unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn horizon_is_bounded() {
        let records = vec![record(2010, 1, Some(5.0))];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        assert_eq!(
            find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 1, 2020),
            Some(5.0)
        );
        assert_eq!(
            find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 2, 2020),
            None
        );
        let short = PriorPeriodLookup::new(&refs, 3);
        assert_eq!(
            short.nearest_prior_average(CrimeCategory::VehicleRobbery, Period::new(2010, 5).unwrap()),
            None
        );
        assert_eq!(
            short.nearest_prior_average(CrimeCategory::VehicleRobbery, Period::new(2010, 4).unwrap()),
            Some(5.0)
        );
    }

    #[test]
    fn nothing_before_target() {
        let records = vec![record(2023, 5, Some(5.0))];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        assert_eq!(
            find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 5, 2023),
            None
        );
    }

    #[test]
    fn out_of_range_target_has_no_prior() {
        let records = vec![record(2022, 12, Some(3.0))];
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        assert_eq!(
            find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 0, 2023),
            None
        );
        assert_eq!(
            find_nearest_prior_average(&refs, CrimeCategory::VehicleRobbery, 13, 2022),
            None
        );
        assert_eq!(find_nearest_prior_average(&[], CrimeCategory::Fraud, 0, 2023), None);
    }
}
