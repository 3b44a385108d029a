//! Groups records into monthly buckets and sums the declared categories.

use std::collections::BTreeMap;

use crime_monitor_crime_models::{AggregatedPeriod, CrimeCategory, CrimeRecord, Period};

/// Sums `categories` per period across every record.
///
/// The output is ordered ascending by period with no duplicate keys. Every
/// declared category appears in every bucket; missing values contribute
/// nothing to the sum. Calendar gaps are not filled. An empty input yields
/// an empty output.
#[must_use]
pub fn aggregate_by_period(
    records: &[&CrimeRecord],
    categories: &[CrimeCategory],
) -> Vec<AggregatedPeriod> {
    let mut buckets: BTreeMap<Period, BTreeMap<CrimeCategory, f64>> = BTreeMap::new();

    for record in records {
        let totals = buckets
            .entry(record.period)
            .or_insert_with(|| categories.iter().map(|c| (*c, 0.0)).collect());
        for category in categories {
            if let Some(value) = record.value(*category) {
                *totals.entry(*category).or_insert(0.0) += value;
            }
        }
    }

    log::debug!(
        "Aggregated {} records into {} periods",
        records.len(),
        buckets.len()
    );

    buckets
        .into_iter()
        .map(|(period, totals)| AggregatedPeriod { period, totals })
        .collect()
}

/// Extracts one category's totals as a plain series, in period order.
#[must_use]
pub fn category_series(periods: &[AggregatedPeriod], category: CrimeCategory) -> Vec<f64> {
    periods.iter().map(|p| p.total(category)).collect()
}

/// Finds the aggregated entry for `period`.
#[must_use]
pub fn find_period(periods: &[AggregatedPeriod], period: Period) -> Option<&AggregatedPeriod> {
    periods
        .binary_search_by(|p| p.period.cmp(&period))
        .ok()
        .map(|idx| &periods[idx])
}
