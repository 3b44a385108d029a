//! The three public analytics operations over a loaded record snapshot.

use std::sync::Arc;

use crime_monitor_analytics_models::{
    ClusterQuery, ClusterResult, DateRange, ForecastRequest, ForecastResult, KpiQuery, PeriodKpis,
    RegionFilter,
};
use crime_monitor_crime_models::{CrimeCategory, CrimeRecord, Period};
use crime_monitor_model::PredictiveModel;

use crate::AnalyticsError;
use crate::aggregate::{aggregate_by_period, category_series};
use crate::cancel::CancelToken;
use crate::clustering::{ClusteringConfig, run_pipeline};
use crate::drivers::attribute_drivers;
use crate::filter::filter_records;
use crate::interval::{BootstrapConfig, bootstrap_interval};
use crate::kpi::derive_kpis;
use crate::lookup::{DEFAULT_LOOKBACK_HORIZON, PriorPeriodLookup};
use crate::risk::classify_risk;
use crate::trend::classify_trend_against;

/// Tunables shared by every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bootstrap trials per forecast.
    pub bootstrap_trials: usize,
    /// Seed for every randomized step.
    pub seed: u64,
    /// Cluster count used when a query does not name one.
    pub default_k: usize,
    /// Cap on k-means rounds.
    pub kmeans_max_iter: usize,
    /// Months searched backwards for a prior value.
    pub lookback_horizon: usize,
    /// Maximum rows used for the silhouette score.
    pub silhouette_sample: usize,
    /// Largest k on the elbow curve.
    pub elbow_max_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bootstrap_trials: 1000,
            seed: 42,
            default_k: 4,
            kmeans_max_iter: 300,
            lookback_horizon: DEFAULT_LOOKBACK_HORIZON,
            silhouette_sample: 2000,
            elbow_max_k: 10,
        }
    }
}

impl EngineConfig {
    fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig::new(self.bootstrap_trials).with_seed(self.seed)
    }

    fn clustering(&self) -> ClusteringConfig {
        ClusteringConfig {
            max_iter: self.kmeans_max_iter,
            seed: self.seed,
            silhouette_sample: self.silhouette_sample,
            elbow_max_k: self.elbow_max_k,
            ..ClusteringConfig::default()
        }
    }
}

/// Analytics over an immutable record snapshot.
///
/// The predictive model is optional: without one, [`Engine::forecast`]
/// fails with [`AnalyticsError::ModelUnavailable`] while the other
/// operations keep working.
pub struct Engine {
    records: Vec<CrimeRecord>,
    model: Option<Arc<dyn PredictiveModel>>,
    config: EngineConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("records", &self.records.len())
            .field("model", &self.model.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Engine {
    /// Creates an engine over `records`.
    #[must_use]
    pub fn new(
        records: Vec<CrimeRecord>,
        model: Option<Arc<dyn PredictiveModel>>,
        config: EngineConfig,
    ) -> Self {
        log::info!(
            "Analytics engine ready with {} records (model loaded: {})",
            records.len(),
            model.is_some()
        );
        Self {
            records,
            model,
            config,
        }
    }

    /// Number of records in the snapshot.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Whether a predictive model is loaded.
    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Headline indicators for the records matching `query`.
    ///
    /// A query that matches nothing yields [`PeriodKpis::empty`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidParameter`] for a malformed date
    /// range.
    pub fn period_kpis(&self, query: &KpiQuery) -> Result<PeriodKpis, AnalyticsError> {
        let selected = filter_records(&self.records, query.date_range.as_ref(), &query.region)?;
        let periods = aggregate_by_period(&selected, CrimeCategory::all());
        Ok(derive_kpis(&periods))
    }

    /// Predicts the primary category for one region and period, with an
    /// uncertainty band, a trend and risk label, and the main drivers.
    ///
    /// History is every record of the request's region strictly before
    /// the target period.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::ModelUnavailable`] if no model is loaded.
    /// * [`AnalyticsError::InvalidParameter`] for an out-of-range period.
    /// * [`AnalyticsError::Model`] if the model rejects the features.
    /// * [`AnalyticsError::Cancelled`] if `cancel` is tripped.
    pub fn forecast(
        &self,
        request: &ForecastRequest,
        cancel: &CancelToken,
    ) -> Result<ForecastResult, AnalyticsError> {
        let model = self.model.as_ref().ok_or(AnalyticsError::ModelUnavailable)?;
        let period = Period::new(request.period.year, request.period.month).map_err(|e| {
            AnalyticsError::InvalidParameter {
                message: e.to_string(),
            }
        })?;

        let predicted_value = model.predict(&request.features)?;
        cancel.check()?;

        let region = RegionFilter::from_region(&request.region);
        let history: Vec<&CrimeRecord> = self
            .records
            .iter()
            .filter(|r| r.period < period && region.matches(r))
            .collect();
        let periods = aggregate_by_period(&history, &[CrimeCategory::PRIMARY]);
        let series = category_series(&periods, CrimeCategory::PRIMARY);

        let interval = bootstrap_interval(predicted_value, &series, &self.config.bootstrap(), cancel)?;

        let lookup = PriorPeriodLookup::new(&history, self.config.lookback_horizon);
        let reference_value = lookup.nearest_prior_average(CrimeCategory::PRIMARY, period);
        let drivers = attribute_drivers(
            &request.features,
            &model.feature_importances(),
            &lookup,
            period,
        );

        log::debug!(
            "Forecast for {period}: {predicted_value:.2} from {} history periods",
            series.len()
        );

        Ok(ForecastResult {
            region: request.region.clone(),
            period,
            predicted_value,
            interval,
            reference_value,
            trend: classify_trend_against(predicted_value, reference_value),
            risk: classify_risk(predicted_value, &series),
            drivers,
        })
    }

    /// Clusters the records matching `query`.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidParameter`] for a malformed date range or
    ///   an unusable `k`.
    /// * [`AnalyticsError::InvalidInput`] if nothing matches or no retained
    ///   feature has data.
    /// * [`AnalyticsError::Cancelled`] if `cancel` is tripped.
    pub fn clusters(
        &self,
        query: &ClusterQuery,
        cancel: &CancelToken,
    ) -> Result<ClusterResult, AnalyticsError> {
        let selected = filter_records(&self.records, query.date_range.as_ref(), &query.region)?;
        let k = query.k.unwrap_or(self.config.default_k);
        run_pipeline(&selected, k, &self.config.clustering(), cancel)
    }

    /// Every period present in the snapshot, as a date range.
    #[must_use]
    pub fn coverage(&self) -> Option<DateRange> {
        let from = self.records.iter().map(|r| r.period).min()?;
        let to = self.records.iter().map(|r| r.period).max()?;
        Some(DateRange { from, to })
    }
}
