#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical analytics engine over monthly, region-tagged crime records.
//!
//! Every operation is a pure, synchronous function over an explicitly
//! passed record snapshot. The [`engine::Engine`] type wires the pieces
//! together behind the three public operations (period KPIs, forecast,
//! clusters); the individual modules are usable on their own.
//!
//! The bootstrap and clustering loops are CPU-bound. Callers serving
//! concurrent requests should run them on a worker pool and pass a
//! [`cancel::CancelToken`] that they trip when the request is abandoned.

pub mod aggregate;
pub mod cancel;
pub mod clustering;
pub mod drivers;
pub mod engine;
pub mod filter;
pub mod interval;
pub mod kpi;
pub mod lookup;
pub mod risk;
pub mod stats;
pub mod trend;

use crime_monitor_model::ModelError;
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A caller-supplied parameter was rejected before computation.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what went wrong.
        message: String,
    },

    /// The input data cannot be processed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what went wrong.
        message: String,
    },

    /// No predictive model was loaded.
    #[error("Predictive model unavailable")]
    ModelUnavailable,

    /// The predictive model failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The computation was abandoned by the caller.
    #[error("Computation cancelled")]
    Cancelled,
}
