#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime category vocabulary, reporting periods, and region-tagged records.
//!
//! This crate defines the canonical record shape used across the entire
//! crime-monitor system. Every record is one region for one calendar month,
//! carrying a count per category from the fixed vocabulary in
//! [`CrimeCategory`].

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Earliest year accepted for a reporting period.
pub const MIN_YEAR: i32 = 2000;

/// A feature vector handed to the predictive model, keyed by feature name.
pub type FeatureVector = BTreeMap<String, f64>;

/// A monthly reporting period.
///
/// Ordering is chronological: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year (>= 2000).
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

impl Period {
    /// Creates a period after validating the year and month.
    ///
    /// # Errors
    ///
    /// Returns an error if the year is before [`MIN_YEAR`] or the month is
    /// not in the range 1-12.
    pub const fn new(year: i32, month: u32) -> Result<Self, InvalidPeriodError> {
        if year < MIN_YEAR || month < 1 || month > 12 {
            return Err(InvalidPeriodError::OutOfRange { year, month });
        }
        Ok(Self { year, month })
    }

    /// Returns the calendar month immediately before this one.
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Returns the same month one year earlier.
    #[must_use]
    pub const fn year_before(self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = InvalidPeriodError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || InvalidPeriodError::Malformed {
            input: s.to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(malformed)?;
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;

        Self::new(year, month)
    }
}

/// Error returned when a [`Period`] cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidPeriodError {
    /// Year or month outside the accepted range.
    OutOfRange {
        /// The provided year.
        year: i32,
        /// The provided month.
        month: u32,
    },
    /// The input string was not `YYYY-MM`.
    Malformed {
        /// The rejected input.
        input: String,
    },
}

impl std::fmt::Display for InvalidPeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { year, month } => write!(
                f,
                "invalid period {year}-{month}: expected year >= {MIN_YEAR} and month 1-12"
            ),
            Self::Malformed { input } => {
                write!(f, "invalid period '{input}': expected format YYYY-MM")
            }
        }
    }
}

impl std::error::Error for InvalidPeriodError {}

/// Crime and event categories reported per region and month.
///
/// Serialized with the column names used by the monthly precinct dataset.
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
pub enum CrimeCategory {
    // ── Lethality outcomes ──────────────────────────────
    /// Total violent lethality (sum of the homicide-type counts)
    #[serde(rename = "letalidade_violenta")]
    #[strum(serialize = "letalidade_violenta")]
    TotalLethality,
    /// Intentional homicide
    #[serde(rename = "hom_doloso")]
    #[strum(serialize = "hom_doloso")]
    IntentionalHomicide,
    /// Robbery followed by death
    #[serde(rename = "latrocinio")]
    #[strum(serialize = "latrocinio")]
    RobberyFollowedByDeath,
    /// Deaths from police intervention
    #[serde(rename = "hom_por_interv_policial")]
    #[strum(serialize = "hom_por_interv_policial")]
    PoliceInterventionDeaths,

    // ── Contextual ──────────────────────────────────────
    /// Attempted homicide
    #[serde(rename = "tentat_hom")]
    #[strum(serialize = "tentat_hom")]
    AttemptedHomicide,
    /// Rape
    #[serde(rename = "estupro")]
    #[strum(serialize = "estupro")]
    Rape,
    /// Negligent bodily injury (mostly traffic)
    #[serde(rename = "lesao_corp_culposa")]
    #[strum(serialize = "lesao_corp_culposa")]
    NegligentBodilyInjury,
    /// Vehicle robbery
    #[serde(rename = "roubo_veiculo")]
    #[strum(serialize = "roubo_veiculo")]
    VehicleRobbery,
    /// Street robbery
    #[serde(rename = "roubo_rua")]
    #[strum(serialize = "roubo_rua")]
    StreetRobbery,
    /// Fraud
    #[serde(rename = "estelionato")]
    #[strum(serialize = "estelionato")]
    Fraud,
    /// Drug seizures
    #[serde(rename = "apreensao_drogas")]
    #[strum(serialize = "apreensao_drogas")]
    DrugSeizures,
    /// Drug trafficking
    #[serde(rename = "trafico_drogas")]
    #[strum(serialize = "trafico_drogas")]
    DrugTrafficking,
    /// Arrests in flagrante delicto
    #[serde(rename = "apf")]
    #[strum(serialize = "apf")]
    ArrestsInFlagrante,
    /// Reported missing persons
    #[serde(rename = "pessoas_desaparecidas")]
    #[strum(serialize = "pessoas_desaparecidas")]
    MissingPersons,
    /// Bodies found
    #[serde(rename = "encontro_cadaver")]
    #[strum(serialize = "encontro_cadaver")]
    BodiesFound,
    /// Total recorded occurrences
    #[serde(rename = "registro_ocorrencias")]
    #[strum(serialize = "registro_ocorrencias")]
    RecordedOccurrences,
}

impl CrimeCategory {
    /// The primary outcome every trend and forecast is measured against.
    pub const PRIMARY: Self = Self::TotalLethality;

    /// Returns `true` for the homicide-type outcome categories.
    #[must_use]
    pub const fn is_lethality_outcome(self) -> bool {
        matches!(
            self,
            Self::TotalLethality
                | Self::IntentionalHomicide
                | Self::RobberyFollowedByDeath
                | Self::PoliceInterventionDeaths
        )
    }

    /// Returns the four headline lethality categories.
    #[must_use]
    pub const fn headline() -> &'static [Self] {
        &[
            Self::TotalLethality,
            Self::IntentionalHomicide,
            Self::RobberyFollowedByDeath,
            Self::PoliceInterventionDeaths,
        ]
    }

    /// Returns the contextual categories used for correlation outputs.
    #[must_use]
    pub fn contextual() -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|c| !c.is_lethality_outcome())
            .collect()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TotalLethality,
            Self::IntentionalHomicide,
            Self::RobberyFollowedByDeath,
            Self::PoliceInterventionDeaths,
            Self::AttemptedHomicide,
            Self::Rape,
            Self::NegligentBodilyInjury,
            Self::VehicleRobbery,
            Self::StreetRobbery,
            Self::Fraud,
            Self::DrugSeizures,
            Self::DrugTrafficking,
            Self::ArrestsInFlagrante,
            Self::MissingPersons,
            Self::BodiesFound,
            Self::RecordedOccurrences,
        ]
    }
}

/// Parallel geographic identifiers a record may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionKeys {
    /// Police precinct (`cisp`).
    pub precinct: Option<String>,
    /// Municipality (`mcirc`).
    pub municipality: Option<String>,
    /// Integrated public safety area (`aisp`).
    pub integration_area: Option<String>,
    /// Integrated responsibility region (`risp`).
    pub responsibility_area: Option<String>,
}

/// Feature names that identify a region or a period rather than measure it.
pub const IDENTIFIER_FEATURES: &[&str] = &[
    "cisp", "mcirc", "aisp", "risp", "mes", "ano", "month", "year",
];

/// One region for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeRecord {
    /// Region identifiers.
    pub region: RegionKeys,
    /// Reporting month.
    pub period: Period,
    /// Count per category. Absent entries are missing, not zero.
    pub counts: BTreeMap<CrimeCategory, f64>,
}

impl CrimeRecord {
    /// Returns the count for `category`, or `None` if it was not reported.
    #[must_use]
    pub fn value(&self, category: CrimeCategory) -> Option<f64> {
        self.counts.get(&category).copied()
    }
}

/// Summed counts for one period across every contributing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPeriod {
    /// The period key.
    pub period: Period,
    /// Sum per category.
    pub totals: BTreeMap<CrimeCategory, f64>,
}

impl AggregatedPeriod {
    /// Returns the summed count for `category` (zero when nothing was reported).
    #[must_use]
    pub fn total(&self, category: CrimeCategory) -> f64 {
        self.totals.get(&category).copied().unwrap_or(0.0)
    }
}

/// A forecast handed to the prediction sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    /// Region the prediction is for.
    pub region: RegionKeys,
    /// Target period.
    pub period: Period,
    /// Predicted value of the primary category.
    pub predicted_value: f64,
    /// Feature vector the prediction was computed from.
    pub features: FeatureVector,
}
