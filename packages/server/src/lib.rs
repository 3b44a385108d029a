#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime monitor.
//!
//! Loads the monthly record snapshot and the predictive model once at
//! startup, then serves period KPIs, forecasts and clusterings as JSON.
//! Forecasts are persisted to a `SQLite` predictions database on a
//! best-effort basis.

mod handlers;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crime_monitor_analytics::engine::{Engine, EngineConfig};
use crime_monitor_model::{LinearModel, PredictiveModel};
use crime_monitor_sink::{LogSink, PredictionSink, SqliteSink};
use crime_monitor_source::{CsvRecordSource, RecordSource};

/// Shared application state.
pub struct AppState {
    /// Analytics over the loaded snapshot.
    pub engine: Arc<Engine>,
    /// Where computed forecasts are persisted.
    pub sink: Arc<dyn PredictionSink>,
    /// Bound on one analytics computation.
    pub analytics_timeout: Duration,
    /// Bound on one sink call.
    pub sink_timeout: Duration,
}

/// Startup configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Monthly statistics CSV (`DATA_PATH`).
    pub data_path: PathBuf,
    /// Linear model definition (`MODEL_PATH`).
    pub model_path: PathBuf,
    /// Predictions database (`PREDICTIONS_DB_PATH`).
    pub predictions_db_path: PathBuf,
    /// Sink timeout (`SINK_TIMEOUT_MS`).
    pub sink_timeout: Duration,
    /// Analytics timeout (`ANALYTICS_TIMEOUT_MS`).
    pub analytics_timeout: Duration,
    /// Engine tunables (`BOOTSTRAP_TRIALS`, `RANDOM_SEED`).
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for
    /// missing or unparseable values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            bootstrap_trials: parsed("BOOTSTRAP_TRIALS")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(defaults.bootstrap_trials),
            seed: parsed("RANDOM_SEED").unwrap_or(defaults.seed),
            ..defaults
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_path: path("DATA_PATH", crime_monitor_source::DEFAULT_DATA_PATH),
            model_path: path("MODEL_PATH", "data/model.toml"),
            predictions_db_path: path("PREDICTIONS_DB_PATH", crime_monitor_sink::DEFAULT_DB_PATH),
            sink_timeout: parsed("SINK_TIMEOUT_MS")
                .map_or(crime_monitor_sink::DEFAULT_TIMEOUT, Duration::from_millis),
            analytics_timeout: Duration::from_millis(
                parsed("ANALYTICS_TIMEOUT_MS").unwrap_or(30_000),
            ),
            engine,
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/kpis", web::get().to(handlers::kpis))
            .route("/forecast", web::post().to(handlers::forecast))
            .route("/clusters", web::get().to(handlers::clusters)),
    );
}

/// Loads the model, or `None` (forecasts disabled) if it cannot be read.
fn load_model(path: &Path) -> Option<Arc<dyn PredictiveModel>> {
    match LinearModel::load(path) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            log::warn!("Forecasts disabled, could not load model from {}: {e}", path.display());
            None
        }
    }
}

/// Opens the predictions database, falling back to logging only.
async fn open_sink(path: &Path) -> Arc<dyn PredictionSink> {
    match SqliteSink::open(path).await {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            log::warn!(
                "Could not open predictions database at {}: {e}; predictions will only be logged",
                path.display()
            );
            Arc::new(LogSink)
        }
    }
}

/// Starts the crime monitor API server.
///
/// This is a regular async function: the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the record file cannot be loaded.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();

    let source = CsvRecordSource::new(&config.data_path);
    log::info!("Loading records from {}...", source.name());
    let records = source.load().await.expect("Failed to load crime records");

    let model = load_model(&config.model_path);
    let sink = open_sink(&config.predictions_db_path).await;

    let state = web::Data::new(AppState {
        engine: Arc::new(Engine::new(records, model, config.engine)),
        sink,
        analytics_timeout: config.analytics_timeout,
        sink_timeout: config.sink_timeout,
    });

    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.sink_timeout, Duration::from_secs(2));
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(
            config.data_path,
            PathBuf::from(crime_monitor_source::DEFAULT_DATA_PATH)
        );
    }

    #[test]
    fn reads_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9090"),
            ("SINK_TIMEOUT_MS", "250"),
            ("BOOTSTRAP_TRIALS", "200"),
            ("RANDOM_SEED", "7"),
            ("MODEL_PATH", "/tmp/model.toml"),
        ]);
        let config = ServerConfig::from_lookup(|k| env.get(k).map(ToString::to_string));
        assert_eq!(config.port, 9090);
        assert_eq!(config.sink_timeout, Duration::from_millis(250));
        assert_eq!(config.engine.bootstrap_trials, 200);
        assert_eq!(config.engine.seed, 7);
        assert_eq!(config.model_path, PathBuf::from("/tmp/model.toml"));
    }

    #[test]
    fn ignores_unparseable_numbers() {
        let config = ServerConfig::from_lookup(|k| (k == "PORT").then(|| "http".to_string()));
        assert_eq!(config.port, 8080);
    }
}
