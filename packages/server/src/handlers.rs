//! HTTP handler functions for the crime monitor API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use crime_monitor_analytics::AnalyticsError;
use crime_monitor_analytics::cancel::CancelToken;
use crime_monitor_analytics::engine::Engine;
use crime_monitor_analytics_models::ForecastRequest;
use crime_monitor_server_models::{ApiError, ApiHealth, ClusterQueryParams, FilterParams};
use crime_monitor_sink::store_best_effort;

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: state.engine.record_count(),
        model_loaded: state.engine.has_model(),
        coverage: state.engine.coverage(),
    })
}

/// `GET /api/kpis`
///
/// Headline indicators for the latest period matching the filters.
pub async fn kpis(state: web::Data<AppState>, params: web::Query<FilterParams>) -> HttpResponse {
    let query = match params.to_kpi_query() {
        Ok(query) => query,
        Err(message) => return HttpResponse::BadRequest().json(ApiError::new(message)),
    };

    match run_analytics(&state, move |engine, _| engine.period_kpis(&query)).await {
        Ok(kpis) => HttpResponse::Ok().json(kpis),
        Err(response) => response,
    }
}

/// `POST /api/forecast`
///
/// Predicts the primary category for one region and period. The result is
/// handed to the prediction sink before responding; sink failures are
/// logged and do not affect the response.
pub async fn forecast(
    state: web::Data<AppState>,
    body: web::Json<ForecastRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let features = request.features.clone();

    let result = match run_analytics(&state, move |engine, cancel| {
        engine.forecast(&request, cancel)
    })
    .await
    {
        Ok(result) => result,
        Err(response) => return response,
    };

    let record = result.prediction_record(&features);
    store_best_effort(state.sink.as_ref(), &record, state.sink_timeout).await;

    HttpResponse::Ok().json(result)
}

/// `GET /api/clusters`
///
/// Clusters the records matching the filters into `k` groups.
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<ClusterQueryParams>,
) -> HttpResponse {
    let query = match params.to_cluster_query() {
        Ok(query) => query,
        Err(message) => return HttpResponse::BadRequest().json(ApiError::new(message)),
    };

    match run_analytics(&state, move |engine, cancel| engine.clusters(&query, cancel)).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(response) => response,
    }
}

/// Runs `op` on the blocking worker pool, bounded by the analytics
/// timeout.
///
/// The computation is cancelled if the timeout elapses or if this future
/// is dropped because the client went away.
async fn run_analytics<T, F>(state: &AppState, op: F) -> Result<T, HttpResponse>
where
    T: Send + 'static,
    F: FnOnce(&Engine, &CancelToken) -> Result<T, AnalyticsError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    let cancel = CancelToken::new();
    let mut guard = cancel.cancel_on_drop();
    let worker_cancel = cancel.clone();

    let outcome = tokio::time::timeout(
        state.analytics_timeout,
        web::block(move || op(&engine, &worker_cancel)),
    )
    .await;
    guard.disarm();

    match outcome {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(error_response(&e)),
        Ok(Err(e)) => {
            log::error!("Analytics worker failed: {e}");
            Err(HttpResponse::InternalServerError().json(ApiError::new("Analytics worker failed")))
        }
        Err(_) => {
            cancel.cancel();
            log::warn!(
                "Analytics computation exceeded {}ms, cancelling",
                state.analytics_timeout.as_millis()
            );
            Err(HttpResponse::ServiceUnavailable().json(ApiError::new("Computation timed out")))
        }
    }
}

/// Maps an analytics error onto an HTTP response.
fn error_response(e: &AnalyticsError) -> HttpResponse {
    match e {
        AnalyticsError::InvalidParameter { .. } | AnalyticsError::InvalidInput { .. } => {
            log::debug!("Rejected request: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        AnalyticsError::ModelUnavailable | AnalyticsError::Cancelled => {
            log::warn!("{e}");
            HttpResponse::ServiceUnavailable().json(ApiError::new(e.to_string()))
        }
        AnalyticsError::Model(_) => {
            log::error!("{e}");
            HttpResponse::InternalServerError().json(ApiError::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use crime_monitor_analytics::engine::EngineConfig;
    use crime_monitor_crime_models::{
        CrimeCategory, CrimeRecord, FeatureVector, Period, PredictionRecord, RegionKeys,
    };
    use crime_monitor_model::{ModelError, PredictiveModel};
    use crime_monitor_sink::{PredictionSink, SinkError};

    use super::*;
    use crate::configure;

    struct ConstantModel;

    impl PredictiveModel for ConstantModel {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            Ok(12.0)
        }

        fn feature_importances(&self) -> BTreeMap<String, f64> {
            BTreeMap::new()
        }
    }

    struct FailingSink;

    #[async_trait]
    impl PredictionSink for FailingSink {
        async fn store(&self, _record: &PredictionRecord) -> Result<(), SinkError> {
            Err(SinkError::Database("unavailable".to_string()))
        }
    }

    fn records() -> Vec<CrimeRecord> {
        (1..=4)
            .map(|month| CrimeRecord {
                region: RegionKeys {
                    precinct: Some("1".to_string()),
                    ..RegionKeys::default()
                },
                period: Period::new(2023, month).unwrap(),
                counts: BTreeMap::from([
                    (CrimeCategory::TotalLethality, f64::from(month) * 10.0),
                    (CrimeCategory::VehicleRobbery, f64::from(month)),
                ]),
            })
            .collect()
    }

    fn state(model: bool) -> web::Data<AppState> {
        let model: Option<Arc<dyn PredictiveModel>> = if model {
            Some(Arc::new(ConstantModel))
        } else {
            None
        };
        web::Data::new(AppState {
            engine: Arc::new(Engine::new(records(), model, EngineConfig::default())),
            sink: Arc::new(FailingSink),
            analytics_timeout: Duration::from_secs(30),
            sink_timeout: Duration::from_millis(100),
        })
    }

    #[actix_web::test]
    async fn health_reports_snapshot() {
        let app = test::init_service(App::new().app_data(state(false)).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["records"], 4);
        assert_eq!(body["modelLoaded"], false);
    }

    #[actix_web::test]
    async fn kpis_validate_dates() {
        let app = test::init_service(App::new().app_data(state(false)).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/kpis?from=2023-01&to=2023-04&precinct=1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/kpis?from=2023-04&to=2023-01")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/kpis?from=bogus").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn forecast_requires_model() {
        let app = test::init_service(App::new().app_data(state(false)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({
                "period": {"year": 2023, "month": 5},
                "features": {"roubo_veiculo": 5.0}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn forecast_survives_sink_failure() {
        let app = test::init_service(App::new().app_data(state(true)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/forecast")
            .set_json(serde_json::json!({
                "region": {"precinct": "1"},
                "period": {"year": 2023, "month": 5},
                "features": {"roubo_veiculo": 5.0}
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["predictedValue"], 12.0);
        assert_eq!(body["referenceValue"], 40.0);
    }

    #[actix_web::test]
    async fn clusters_reject_bad_k() {
        let app = test::init_service(App::new().app_data(state(false)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/clusters?k=0").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/clusters?k=2").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["k"], 2);
        assert_eq!(body["points"].as_array().map(Vec::len), Some(4));
    }

    #[::core::prelude::v1::test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (
                AnalyticsError::InvalidParameter {
                    message: "k".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AnalyticsError::InvalidInput {
                    message: "empty".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AnalyticsError::ModelUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (AnalyticsError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                AnalyticsError::Model(ModelError::NonFinitePrediction),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error_response(&error).status(), status);
        }
    }
}
