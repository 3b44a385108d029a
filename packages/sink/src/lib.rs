#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Best-effort persistence of forecast results.
//!
//! A forecast is handed to a [`PredictionSink`] after it has been computed.
//! Failures are the sink's problem: [`store_best_effort`] bounds the call
//! with a timeout, logs any error and never propagates it to the caller of
//! the forecast.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use crime_monitor_crime_models::PredictionRecord;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

/// Default path for the predictions database.
pub const DEFAULT_DB_PATH: &str = "data/predictions.db";

/// Default bound on a single sink call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from prediction storage.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for computed forecasts.
#[async_trait]
pub trait PredictionSink: Send + Sync {
    /// Persists one prediction.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record cannot be stored.
    async fn store(&self, record: &PredictionRecord) -> Result<(), SinkError>;
}

/// Stores `record` in `sink`, waiting at most `timeout`.
///
/// Returns whether the record was stored. Errors and timeouts are logged
/// at warn level and swallowed.
pub async fn store_best_effort(
    sink: &dyn PredictionSink,
    record: &PredictionRecord,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, sink.store(record)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::warn!("Failed to store prediction for {}: {e}", record.period);
            false
        }
        Err(_) => {
            log::warn!(
                "Storing prediction for {} timed out after {}ms",
                record.period,
                timeout.as_millis()
            );
            false
        }
    }
}

/// Sink that only writes predictions to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl PredictionSink for LogSink {
    async fn store(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        log::info!(
            "Prediction for {} (precinct {}): {:.2}",
            record.period,
            record.region.precinct.as_deref().unwrap_or("-"),
            record.predicted_value
        );
        Ok(())
    }
}

/// Sink backed by a `SQLite` `predictions` table.
pub struct SqliteSink {
    db: Box<dyn Database>,
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink").finish_non_exhaustive()
    }
}

impl SqliteSink {
    /// Opens (or creates) the predictions database and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the database cannot be opened or schema
    /// creation fails.
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| SinkError::Database(e.to_string()))?;
        ensure_schema(db.as_ref()).await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl PredictionSink for SqliteSink {
    async fn store(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        let features = serde_json::to_string(&record.features)?;
        let now = chrono::Utc::now().to_rfc3339();
        let optional = |value: &Option<String>| {
            value
                .clone()
                .map_or(DatabaseValue::Null, DatabaseValue::String)
        };

        #[allow(clippy::cast_possible_wrap)]
        let month = record.period.month as i32;

        self.db
            .exec_raw_params(
                "INSERT INTO predictions
                   (precinct, municipality, integration_area, responsibility_area,
                    year, month, predicted_value, features, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    optional(&record.region.precinct),
                    optional(&record.region.municipality),
                    optional(&record.region.integration_area),
                    optional(&record.region.responsibility_area),
                    DatabaseValue::Int32(record.period.year),
                    DatabaseValue::Int32(month),
                    DatabaseValue::Real64(record.predicted_value),
                    DatabaseValue::String(features),
                    DatabaseValue::String(now),
                ],
            )
            .await
            .map_err(|e| SinkError::Database(e.to_string()))?;

        log::debug!("Stored prediction for {}", record.period);
        Ok(())
    }
}

async fn ensure_schema(db: &dyn Database) -> Result<(), SinkError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS predictions (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            precinct            TEXT,
            municipality        TEXT,
            integration_area    TEXT,
            responsibility_area TEXT,
            year                INTEGER NOT NULL,
            month               INTEGER NOT NULL,
            predicted_value     REAL NOT NULL,
            features            TEXT NOT NULL,
            created_at          TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| SinkError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_predictions_period
         ON predictions (year, month)",
    )
    .await
    .map_err(|e| SinkError::Database(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crime_monitor_crime_models::{Period, RegionKeys};
    use moosicbox_json_utils::database::ToValue as _;

    use super::*;

    /// A prediction row read back from the database.
    #[derive(Debug)]
    struct StoredPrediction {
        precinct: Option<String>,
        period: Period,
        predicted_value: f64,
        features: String,
        created_at: String,
    }

    async fn count(sink: &SqliteSink) -> i64 {
        let rows = sink
            .db
            .query_raw_params("SELECT COUNT(*) as cnt FROM predictions", &[])
            .await
            .unwrap();
        (&rows[0]).to_value("cnt").unwrap()
    }

    async fn recent(sink: &SqliteSink, limit: i32) -> Vec<StoredPrediction> {
        let rows = sink
            .db
            .query_raw_params(
                "SELECT precinct, year, month, predicted_value, features, created_at
                 FROM predictions
                 ORDER BY id DESC
                 LIMIT $1",
                &[DatabaseValue::Int32(limit)],
            )
            .await
            .unwrap();

        rows.iter()
            .map(|row| {
                let month: i32 = row.to_value("month").unwrap();
                StoredPrediction {
                    precinct: row.to_value("precinct").unwrap(),
                    period: Period {
                        year: row.to_value("year").unwrap(),
                        month: u32::try_from(month).unwrap(),
                    },
                    predicted_value: row.to_value("predicted_value").unwrap(),
                    features: row.to_value("features").unwrap(),
                    created_at: row.to_value("created_at").unwrap(),
                }
            })
            .collect()
    }

    fn record() -> PredictionRecord {
        PredictionRecord {
            region: RegionKeys {
                precinct: Some("5".to_string()),
                ..RegionKeys::default()
            },
            period: Period::new(2024, 3).unwrap(),
            predicted_value: 12.5,
            features: BTreeMap::from([("roubo_veiculo".to_string(), 40.0)]),
        }
    }

    struct FailingSink;

    #[async_trait]
    impl PredictionSink for FailingSink {
        async fn store(&self, _record: &PredictionRecord) -> Result<(), SinkError> {
            Err(SinkError::Database("disk full".to_string()))
        }
    }

    struct SlowSink;

    #[async_trait]
    impl PredictionSink for SlowSink {
        async fn store(&self, _record: &PredictionRecord) -> Result<(), SinkError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() {
        assert!(store_best_effort(&LogSink, &record(), DEFAULT_TIMEOUT).await);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        assert!(!store_best_effort(&FailingSink, &record(), DEFAULT_TIMEOUT).await);
    }

    #[tokio::test]
    async fn slow_sinks_time_out() {
        assert!(!store_best_effort(&SlowSink, &record(), Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn sqlite_sink_round_trip() {
        let dir = std::env::temp_dir().join("crime_monitor_sink_test");
        let _ = std::fs::remove_dir_all(&dir);
        let sink = SqliteSink::open(&dir.join("predictions.db")).await.unwrap();

        assert!(store_best_effort(&sink, &record(), DEFAULT_TIMEOUT).await);
        assert!(store_best_effort(&sink, &record(), DEFAULT_TIMEOUT).await);
        assert_eq!(count(&sink).await, 2);

        let stored = recent(&sink, 1).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].precinct.as_deref(), Some("5"));
        assert_eq!(stored[0].period, Period::new(2024, 3).unwrap());
        assert!((stored[0].predicted_value - 12.5).abs() < f64::EPSILON);
        assert_eq!(stored[0].features, r#"{"roubo_veiculo":40.0}"#);
        assert!(!stored[0].created_at.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
