//! Versioned declaration of the features the clustering pipeline uses.

use crime_monitor_crime_models::CrimeCategory;

/// An explicit, versioned list of retained features.
///
/// New dataset columns are never picked up implicitly: they must be added
/// to a new schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainedFeatureSchema {
    /// Schema version reported alongside results.
    pub version: u32,
    /// Retained features, in column order.
    pub features: &'static [CrimeCategory],
}

/// Version 1: every contextual category. The four lethality outcomes are
/// left out because they are what the forecasting path predicts, and the
/// region/period identifiers are never part of a record's counts.
pub const RETAINED_FEATURES_V1: RetainedFeatureSchema = RetainedFeatureSchema {
    version: 1,
    features: &[
        CrimeCategory::AttemptedHomicide,
        CrimeCategory::Rape,
        CrimeCategory::NegligentBodilyInjury,
        CrimeCategory::VehicleRobbery,
        CrimeCategory::StreetRobbery,
        CrimeCategory::Fraud,
        CrimeCategory::DrugSeizures,
        CrimeCategory::DrugTrafficking,
        CrimeCategory::ArrestsInFlagrante,
        CrimeCategory::MissingPersons,
        CrimeCategory::BodiesFound,
        CrimeCategory::RecordedOccurrences,
    ],
};

impl Default for RetainedFeatureSchema {
    fn default() -> Self {
        RETAINED_FEATURES_V1
    }
}
