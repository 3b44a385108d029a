#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime monitor server.
//!
//! Query-string parameters arrive as loose strings and are converted into
//! the typed analytics queries here, so the handlers only deal with
//! validated values.

use crime_monitor_analytics_models::{ClusterQuery, DateRange, KpiQuery, RegionFilter};
use crime_monitor_crime_models::{MIN_YEAR, Period};
use serde::{Deserialize, Serialize};

/// Upper bound used when a date range only names its start.
const OPEN_END: Period = Period {
    year: 9999,
    month: 12,
};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Number of records in the loaded snapshot.
    pub records: usize,
    /// Whether forecasts can be served.
    pub model_loaded: bool,
    /// First and last period in the snapshot.
    pub coverage: Option<DateRange>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Date range and region filters shared by the query endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// First period (`YYYY-MM`), inclusive.
    pub from: Option<String>,
    /// Last period (`YYYY-MM`), inclusive.
    pub to: Option<String>,
    /// Police precinct code.
    pub precinct: Option<String>,
    /// Municipality code.
    pub municipality: Option<String>,
    /// Integrated public safety area code.
    pub integration_area: Option<String>,
    /// Integrated responsibility region code.
    pub responsibility_area: Option<String>,
}

impl FilterParams {
    /// Parses the period bounds. A missing bound is open-ended.
    ///
    /// # Errors
    ///
    /// Returns a message naming the malformed bound.
    pub fn date_range(&self) -> Result<Option<DateRange>, String> {
        let parse = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.parse::<Period>().map_err(|e| format!("{name}: {e}")))
                .transpose()
        };

        let from = parse(&self.from, "from")?;
        let to = parse(&self.to, "to")?;
        if from.is_none() && to.is_none() {
            return Ok(None);
        }

        Ok(Some(DateRange {
            from: from.unwrap_or(Period {
                year: MIN_YEAR,
                month: 1,
            }),
            to: to.unwrap_or(OPEN_END),
        }))
    }

    /// The region predicate.
    #[must_use]
    pub fn region(&self) -> RegionFilter {
        let key = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
        RegionFilter {
            precinct: key(&self.precinct),
            municipality: key(&self.municipality),
            integration_area: key(&self.integration_area),
            responsibility_area: key(&self.responsibility_area),
        }
    }

    /// Converts into a KPI query.
    ///
    /// # Errors
    ///
    /// Returns a message if a period bound is malformed.
    pub fn to_kpi_query(&self) -> Result<KpiQuery, String> {
        Ok(KpiQuery {
            date_range: self.date_range()?,
            region: self.region(),
        })
    }
}

/// Query parameters for the clusters endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQueryParams {
    /// Number of clusters (server default when absent).
    pub k: Option<usize>,
    /// First period (`YYYY-MM`), inclusive.
    pub from: Option<String>,
    /// Last period (`YYYY-MM`), inclusive.
    pub to: Option<String>,
    /// Police precinct code.
    pub precinct: Option<String>,
    /// Municipality code.
    pub municipality: Option<String>,
    /// Integrated public safety area code.
    pub integration_area: Option<String>,
    /// Integrated responsibility region code.
    pub responsibility_area: Option<String>,
}

impl From<&ClusterQueryParams> for FilterParams {
    fn from(p: &ClusterQueryParams) -> Self {
        Self {
            from: p.from.clone(),
            to: p.to.clone(),
            precinct: p.precinct.clone(),
            municipality: p.municipality.clone(),
            integration_area: p.integration_area.clone(),
            responsibility_area: p.responsibility_area.clone(),
        }
    }
}

impl ClusterQueryParams {
    /// Converts into a cluster query.
    ///
    /// # Errors
    ///
    /// Returns a message if a period bound is malformed.
    pub fn to_cluster_query(&self) -> Result<ClusterQuery, String> {
        let filters = FilterParams::from(self);
        Ok(ClusterQuery {
            k: self.k,
            date_range: filters.date_range()?,
            region: filters.region(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_mean_no_filter() {
        let query = FilterParams::default().to_kpi_query().unwrap();
        assert_eq!(query.date_range, None);
        assert_eq!(query.region, RegionFilter::default());
    }

    #[test]
    fn parses_bounds_and_region() {
        let params = FilterParams {
            from: Some("2023-01".to_string()),
            to: Some("2023-06".to_string()),
            precinct: Some("12".to_string()),
            municipality: Some(String::new()),
            ..FilterParams::default()
        };
        let query = params.to_kpi_query().unwrap();
        let range = query.date_range.unwrap();
        assert_eq!(range.from, Period::new(2023, 1).unwrap());
        assert_eq!(range.to, Period::new(2023, 6).unwrap());
        assert_eq!(query.region.precinct.as_deref(), Some("12"));
        assert_eq!(query.region.municipality, None);
    }

    #[test]
    fn half_open_ranges() {
        let params = FilterParams {
            from: Some("2023-01".to_string()),
            ..FilterParams::default()
        };
        let range = params.date_range().unwrap().unwrap();
        assert_eq!(range.to, OPEN_END);
    }

    #[test]
    fn malformed_bound_is_reported() {
        let params = FilterParams {
            to: Some("2023-13".to_string()),
            ..FilterParams::default()
        };
        let err = params.date_range().unwrap_err();
        assert!(err.starts_with("to:"));
    }

    #[test]
    fn cluster_params_carry_k() {
        let params = ClusterQueryParams {
            k: Some(3),
            precinct: Some("7".to_string()),
            ..ClusterQueryParams::default()
        };
        let query = params.to_cluster_query().unwrap();
        assert_eq!(query.k, Some(3));
        assert_eq!(query.region.precinct.as_deref(), Some("7"));
    }

    #[test]
    fn health_serializes_camel_case() {
        let health = ApiHealth {
            healthy: true,
            version: "0.1.0".to_string(),
            records: 3,
            model_loaded: false,
            coverage: None,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["modelLoaded"], false);
        assert_eq!(json["records"], 3);
    }
}
