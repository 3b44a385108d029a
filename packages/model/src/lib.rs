#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Predictive model contract used by the forecasting path.
//!
//! The analytics engine only sees [`PredictiveModel`]: a point prediction
//! for a feature vector plus per-feature importance weights. How a model is
//! trained is out of scope. [`LinearModel`] is a concrete implementation
//! whose coefficients are read from a TOML file, e.g.:
//!
//! ```toml
//! intercept = 1.5
//!
//! [coefficients]
//! roubo_veiculo = 0.12
//! roubo_rua = 0.03
//!
//! [importances]
//! roubo_veiculo = 0.8
//! roubo_rua = 0.2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crime_monitor_crime_models::FeatureVector;
use serde::Deserialize;

/// Errors that can occur while loading or evaluating a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Model file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model definition is malformed.
    #[error("Invalid model definition: {message}")]
    Definition {
        /// Description of what went wrong.
        message: String,
    },

    /// A feature the model needs is absent from the input.
    #[error("Missing feature: {name}")]
    MissingFeature {
        /// Feature name.
        name: String,
    },

    /// A feature value is NaN or infinite.
    #[error("Feature '{name}' is not a finite number")]
    NonFiniteFeature {
        /// Feature name.
        name: String,
    },

    /// The model produced a non-finite prediction.
    #[error("Model produced a non-finite prediction")]
    NonFinitePrediction,
}

/// A fitted model that maps a feature vector to a scalar prediction.
///
/// Implementations must be usable from several worker threads at once.
pub trait PredictiveModel: Send + Sync {
    /// Predicts the target value for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the features cannot be evaluated.
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Non-negative importance weight per feature, summing to roughly one.
    ///
    /// An empty map means the model does not expose importances.
    fn feature_importances(&self) -> BTreeMap<String, f64>;
}

/// Linear model: `intercept + Σ coefficient × feature`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    /// Constant term.
    #[serde(default)]
    pub intercept: f64,
    /// Coefficient per feature name.
    pub coefficients: BTreeMap<String, f64>,
    /// Importance weight per feature name.
    #[serde(default)]
    pub importances: BTreeMap<String, f64>,
}

impl LinearModel {
    /// Parses a model from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Definition`] if the TOML is malformed, a value
    /// is not finite, or an importance weight is negative.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ModelError> {
        let model: Self = toml::de::from_str(toml_str).map_err(|e| ModelError::Definition {
            message: e.to_string(),
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Loads a model from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        let model = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded linear model from {} ({} coefficients)",
            path.display(),
            model.coefficients.len()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !self.intercept.is_finite() {
            return Err(ModelError::Definition {
                message: "intercept must be finite".to_string(),
            });
        }
        if let Some((name, _)) = self.coefficients.iter().find(|(_, c)| !c.is_finite()) {
            return Err(ModelError::Definition {
                message: format!("coefficient for '{name}' must be finite"),
            });
        }
        if let Some((name, _)) = self
            .importances
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ModelError::Definition {
                message: format!("importance for '{name}' must be a non-negative number"),
            });
        }
        Ok(())
    }
}

impl PredictiveModel for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let mut total = self.intercept;
        for (name, coefficient) in &self.coefficients {
            let value = *features
                .get(name)
                .ok_or_else(|| ModelError::MissingFeature { name: name.clone() })?;
            if !value.is_finite() {
                return Err(ModelError::NonFiniteFeature { name: name.clone() });
            }
            total = coefficient.mul_add(value, total);
        }

        if total.is_finite() {
            Ok(total)
        } else {
            Err(ModelError::NonFinitePrediction)
        }
    }

    fn feature_importances(&self) -> BTreeMap<String, f64> {
        self.importances.clone()
    }
}
