//! Explains a forecast by the features that moved the most.
//!
//! Features are visited in descending model importance. Each one is
//! compared with its average in the nearest earlier period that has data,
//! and the first three that yield a usable comparison are reported.

use std::collections::BTreeMap;

use crime_monitor_analytics_models::{Driver, DriverDirection};
use crime_monitor_crime_models::{CrimeCategory, FeatureVector, IDENTIFIER_FEATURES, Period};

use crate::lookup::PriorPeriodLookup;
use crate::stats;

/// Features with a lower importance weight are ignored.
pub const MIN_IMPORTANCE: f64 = 0.01;
/// Percent change beyond which a feature counts as moving.
pub const DIRECTION_THRESHOLD_PCT: f64 = 3.0;
/// Maximum number of drivers reported.
pub const MAX_DRIVERS: usize = 3;

/// Ranks the features of `current` and returns up to [`MAX_DRIVERS`]
/// explanatory entries. Never pads: sparse history gives fewer entries.
#[must_use]
pub fn attribute_drivers(
    current: &FeatureVector,
    importances: &BTreeMap<String, f64>,
    lookup: &PriorPeriodLookup<'_>,
    target: Period,
) -> Vec<Driver> {
    let mut ranked: Vec<(&String, f64, f64)> = current
        .iter()
        .map(|(name, value)| {
            let weight = importances.get(name).copied().unwrap_or(0.0);
            (name, *value, weight)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

    let mut drivers = Vec::with_capacity(MAX_DRIVERS);
    for (name, value, weight) in ranked {
        if drivers.len() >= MAX_DRIVERS {
            break;
        }
        if weight < MIN_IMPORTANCE || IDENTIFIER_FEATURES.contains(&name.as_str()) {
            continue;
        }
        let Ok(category) = name.parse::<CrimeCategory>() else {
            log::debug!("Feature '{name}' is not a crime category, skipping");
            continue;
        };
        let Some(prior) = lookup.nearest_prior_average(category, target) else {
            continue;
        };
        if prior == 0.0 {
            continue;
        }
        let Some(percent_delta) = stats::finite((value - prior) / prior * 100.0) else {
            continue;
        };

        drivers.push(Driver {
            feature: name.clone(),
            direction: direction_of(percent_delta),
            percent_delta,
        });
    }

    drivers
}

fn direction_of(percent_delta: f64) -> DriverDirection {
    if percent_delta > DIRECTION_THRESHOLD_PCT {
        DriverDirection::Increase
    } else if percent_delta < -DIRECTION_THRESHOLD_PCT {
        DriverDirection::Decrease
    } else {
        DriverDirection::Stable
    }
}
