//! Restricts a record snapshot to a date range and region.

use crime_monitor_analytics_models::{DateRange, RegionFilter};
use crime_monitor_crime_models::CrimeRecord;

use crate::AnalyticsError;

/// Validates a date range.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `from` is after `to`.
pub fn validate_date_range(range: &DateRange) -> Result<(), AnalyticsError> {
    if range.from > range.to {
        return Err(AnalyticsError::InvalidParameter {
            message: format!(
                "date range starts at {} which is after its end {}",
                range.from, range.to
            ),
        });
    }
    Ok(())
}

/// Returns the records inside `date_range` (if any) that satisfy `region`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if the date range is
/// malformed.
pub fn filter_records<'a>(
    records: &'a [CrimeRecord],
    date_range: Option<&DateRange>,
    region: &RegionFilter,
) -> Result<Vec<&'a CrimeRecord>, AnalyticsError> {
    if let Some(range) = date_range {
        validate_date_range(range)?;
    }

    Ok(records
        .iter()
        .filter(|r| date_range.is_none_or(|range| range.contains(r.period)))
        .filter(|r| region.matches(r))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crime_monitor_crime_models::{Period, RegionKeys};

    use super::*;

    fn record(precinct: &str, year: i32, month: u32) -> CrimeRecord {
        CrimeRecord {
            region: RegionKeys {
                precinct: Some(precinct.to_string()),
                ..RegionKeys::default()
            },
            period: Period::new(year, month).unwrap(),
            counts: BTreeMap::new(),
        }
    }

    #[test]
    fn filters_by_range_and_region() {
        let records = vec![
            record("1", 2022, 12),
            record("1", 2023, 1),
            record("2", 2023, 1),
            record("1", 2023, 3),
        ];
        let range = DateRange {
            from: Period::new(2023, 1).unwrap(),
            to: Period::new(2023, 2).unwrap(),
        };
        let region = RegionFilter {
            precinct: Some("1".to_string()),
            ..RegionFilter::default()
        };

        let out = filter_records(&records, Some(&range), &region).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].period, Period::new(2023, 1).unwrap());

        let all = filter_records(&records, None, &RegionFilter::default()).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn rejects_inverted_range() {
        let range = DateRange {
            from: Period::new(2023, 5).unwrap(),
            to: Period::new(2023, 1).unwrap(),
        };
        let err = filter_records(&[], Some(&range), &RegionFilter::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
    }
}
