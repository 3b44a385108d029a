#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics query parameters and result types.
//!
//! Defines the input/output types for each engine operation (period KPIs,
//! forecasts, clusters). Every floating point value that can be undefined
//! is an `Option<f64>` so that it serializes as `null` instead of `NaN`.

use std::collections::BTreeMap;

use crime_monitor_crime_models::{
    AggregatedPeriod, CrimeCategory, CrimeRecord, FeatureVector, Period, PredictionRecord,
    RegionKeys,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Inclusive range of reporting periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First period included.
    pub from: Period,
    /// Last period included.
    pub to: Period,
}

impl DateRange {
    /// Returns `true` if `period` falls inside the range.
    #[must_use]
    pub fn contains(&self, period: Period) -> bool {
        self.from <= period && period <= self.to
    }
}

/// Region predicate. Every key that is set must match the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionFilter {
    /// Police precinct (`cisp`).
    pub precinct: Option<String>,
    /// Municipality (`mcirc`).
    pub municipality: Option<String>,
    /// Integrated public safety area (`aisp`).
    pub integration_area: Option<String>,
    /// Integrated responsibility region (`risp`).
    pub responsibility_area: Option<String>,
}

impl RegionFilter {
    /// Returns `true` if the record's region satisfies every key that is set.
    #[must_use]
    pub fn matches(&self, record: &CrimeRecord) -> bool {
        fn key_matches(wanted: Option<&String>, actual: Option<&String>) -> bool {
            wanted.is_none_or(|w| actual == Some(w))
        }

        let region = &record.region;
        key_matches(self.precinct.as_ref(), region.precinct.as_ref())
            && key_matches(self.municipality.as_ref(), region.municipality.as_ref())
            && key_matches(
                self.integration_area.as_ref(),
                region.integration_area.as_ref(),
            )
            && key_matches(
                self.responsibility_area.as_ref(),
                region.responsibility_area.as_ref(),
            )
    }

    /// Builds the narrowest filter that selects exactly `region`'s keys.
    #[must_use]
    pub fn from_region(region: &RegionKeys) -> Self {
        Self {
            precinct: region.precinct.clone(),
            municipality: region.municipality.clone(),
            integration_area: region.integration_area.clone(),
            responsibility_area: region.responsibility_area.clone(),
        }
    }
}

/// Parameters for the period KPI operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiQuery {
    /// Optional period restriction.
    pub date_range: Option<DateRange>,
    /// Region restriction.
    pub region: RegionFilter,
}

/// Five-point ordered trend scale plus an explicit "not enough data" state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TrendLabel {
    /// Ratio <= -20%
    SevereDecline,
    /// Ratio <= -5%
    MildDecline,
    /// Ratio within (-5%, 5%)
    Stable,
    /// Ratio within [5%, 20%)
    MildIncrease,
    /// Ratio >= 20%
    SevereIncrease,
    /// No usable reference value
    InsufficientData,
}

impl TrendLabel {
    /// Position on the ordered scale, or `None` for [`Self::InsufficientData`].
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::SevereDecline => Some(0),
            Self::MildDecline => Some(1),
            Self::Stable => Some(2),
            Self::MildIncrease => Some(3),
            Self::SevereIncrease => Some(4),
            Self::InsufficientData => None,
        }
    }
}

/// Short-term direction of a series over a rolling four-period window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Momentum {
    /// Recent mean more than 5% above the earlier mean.
    Increasing,
    /// Recent mean more than 5% below the earlier mean.
    Decreasing,
    /// Within 5% either way.
    Stable,
    /// Fewer than four periods available.
    Undefined,
}

/// Risk tier of a predicted value relative to its own history.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RiskTier {
    /// At or below the low threshold.
    Low,
    /// Between the two thresholds.
    Moderate,
    /// Above the high threshold.
    High,
}

/// Pearson correlation between the primary series and one other category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEntry {
    /// The secondary category.
    pub category: CrimeCategory,
    /// Correlation coefficient, `None` when either series has zero variance.
    pub coefficient: Option<f64>,
}

/// Headline indicators for the latest period of a filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodKpis {
    /// `false` when the filter matched no records.
    pub has_data: bool,
    /// Latest period with data.
    pub latest_period: Option<Period>,
    /// Totals per category for the latest period.
    pub latest_totals: BTreeMap<CrimeCategory, f64>,
    /// Percent change of the primary category against the previous period with data.
    pub period_over_period_pct: Option<f64>,
    /// Percent change of intentional homicide against the same month a year earlier.
    pub year_over_year_pct: Option<f64>,
    /// Trend of the primary category, latest against previous.
    pub trend: TrendLabel,
    /// Momentum of the primary category series.
    pub momentum: Momentum,
    /// Correlations between the primary category and each contextual category.
    pub correlations: Vec<CorrelationEntry>,
    /// Headline category totals per period, ascending.
    pub evolution: Vec<AggregatedPeriod>,
}

impl PeriodKpis {
    /// The degenerate structure returned when no records match.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            has_data: false,
            latest_period: None,
            latest_totals: CrimeCategory::all().iter().map(|c| (*c, 0.0)).collect(),
            period_over_period_pct: None,
            year_over_year_pct: None,
            trend: TrendLabel::InsufficientData,
            momentum: Momentum::Undefined,
            correlations: CrimeCategory::contextual()
                .into_iter()
                .map(|category| CorrelationEntry {
                    category,
                    coefficient: None,
                })
                .collect(),
            evolution: Vec::new(),
        }
    }
}

/// Direction of a driver's change against its prior value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriverDirection {
    /// More than 3% above the prior value.
    Increase,
    /// More than 3% below the prior value.
    Decrease,
    /// Within 3% of the prior value.
    Stable,
}

/// A feature whose change helps explain a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Feature name.
    pub feature: String,
    /// Direction of change.
    pub direction: DriverDirection,
    /// Percent change against the nearest prior average.
    pub percent_delta: f64,
}

/// Uncertainty band around a point prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInterval {
    /// Lower bound (never negative).
    pub lower: f64,
    /// Upper bound (never below `lower`).
    pub upper: f64,
    /// Number of bootstrap trials drawn.
    pub trials: usize,
}

/// Parameters for the forecast operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    /// Region the forecast is for.
    #[serde(default)]
    pub region: RegionKeys,
    /// Target period.
    pub period: Period,
    /// Feature vector handed to the predictive model.
    pub features: FeatureVector,
}

/// A point forecast with its explanation and uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Region the forecast is for.
    pub region: RegionKeys,
    /// Target period.
    pub period: Period,
    /// Model output.
    pub predicted_value: f64,
    /// Bootstrap interval.
    pub interval: ForecastInterval,
    /// Nearest prior average of the primary category.
    pub reference_value: Option<f64>,
    /// Trend of the prediction against the reference value.
    pub trend: TrendLabel,
    /// Risk tier against the historical series.
    pub risk: RiskTier,
    /// Up to three explanatory drivers.
    pub drivers: Vec<Driver>,
}

impl ForecastResult {
    /// Builds the record handed to the prediction sink.
    #[must_use]
    pub fn prediction_record(&self, features: &FeatureVector) -> PredictionRecord {
        PredictionRecord {
            region: self.region.clone(),
            period: self.period,
            predicted_value: self.predicted_value,
            features: features.clone(),
        }
    }
}

/// Parameters for the clustering operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQuery {
    /// Requested cluster count (engine default when absent).
    pub k: Option<usize>,
    /// Optional period restriction.
    pub date_range: Option<DateRange>,
    /// Region restriction.
    pub region: RegionFilter,
}

/// One clustered row projected onto the first two principal components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPoint {
    /// Region of the row.
    pub region: RegionKeys,
    /// Period of the row.
    pub period: Period,
    /// Assigned cluster id.
    pub cluster: usize,
    /// First principal component.
    pub pc1: f64,
    /// Second principal component.
    pub pc2: f64,
}

/// Per-cluster feature means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProfile {
    /// Cluster id.
    pub cluster: usize,
    /// Number of rows assigned.
    pub size: usize,
    /// Mean per feature, rounded to two decimals.
    pub means: BTreeMap<CrimeCategory, f64>,
    /// Min-max normalized mean per feature across clusters.
    pub normalized: BTreeMap<CrimeCategory, f64>,
}

/// Ranking score of one feature's power to separate clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    /// The feature.
    pub feature: CrimeCategory,
    /// Between-cluster variance over mean within-cluster variance.
    pub importance: f64,
}

/// Internal validation indices for a clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQuality {
    /// Mean silhouette coefficient (-1 to 1, higher is better).
    pub silhouette: Option<f64>,
    /// Calinski-Harabasz index (higher is better).
    pub calinski_harabasz: Option<f64>,
    /// Davies-Bouldin index (lower is better).
    pub davies_bouldin: Option<f64>,
}

/// Inertia for one candidate cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElbowPoint {
    /// Cluster count.
    pub k: usize,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
}

/// Output of the clustering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    /// Requested cluster count.
    pub requested_k: usize,
    /// Cluster count actually used (capped by distinct rows).
    pub k: usize,
    /// Version of the retained feature schema.
    pub schema_version: u32,
    /// Features the clustering ran on.
    pub features: Vec<CrimeCategory>,
    /// Per-row assignment and 2-D projection.
    pub points: Vec<ClusterPoint>,
    /// Fraction of variance explained by each of the two components.
    pub explained_variance: [Option<f64>; 2],
    /// Per-cluster profiles.
    pub profiles: Vec<ClusterProfile>,
    /// Features ranked by importance, descending.
    pub importances: Vec<FeatureImportance>,
    /// Validation indices.
    pub quality: ClusterQuality,
    /// Inertia per candidate k.
    pub elbow: Vec<ElbowPoint>,
}
