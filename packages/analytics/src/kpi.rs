//! Headline indicators derived from an aggregated period sequence.

use std::collections::BTreeMap;

use crime_monitor_analytics_models::{CorrelationEntry, PeriodKpis};
use crime_monitor_crime_models::{AggregatedPeriod, CrimeCategory};

use crate::aggregate::{category_series, find_period};
use crate::stats;
use crate::trend::{classify_momentum, classify_trend_against};

/// Category whose year-over-year change is reported.
pub const YEAR_OVER_YEAR_CATEGORY: CrimeCategory = CrimeCategory::IntentionalHomicide;

/// Derives the KPI structure from an ascending period sequence.
///
/// The previous period for the period-over-period change is the nearest
/// earlier period with data, i.e. the preceding entry of the sequence.
/// An empty sequence yields [`PeriodKpis::empty`].
#[must_use]
pub fn derive_kpis(periods: &[AggregatedPeriod]) -> PeriodKpis {
    let Some(latest) = periods.last() else {
        log::debug!("No periods to derive KPIs from");
        return PeriodKpis::empty();
    };
    let previous = periods.len().checked_sub(2).map(|idx| &periods[idx]);

    let latest_totals: BTreeMap<CrimeCategory, f64> = CrimeCategory::all()
        .iter()
        .map(|c| (*c, latest.total(*c)))
        .collect();

    let primary_now = latest.total(CrimeCategory::PRIMARY);
    let primary_before = previous.map(|p| p.total(CrimeCategory::PRIMARY));

    let period_over_period_pct =
        primary_before.and_then(|before| stats::percent_change(primary_now, before));

    let year_over_year_pct = find_period(periods, latest.period.year_before()).and_then(|year_ago| {
        stats::percent_change(
            latest.total(YEAR_OVER_YEAR_CATEGORY),
            year_ago.total(YEAR_OVER_YEAR_CATEGORY),
        )
    });

    let primary_series = category_series(periods, CrimeCategory::PRIMARY);

    PeriodKpis {
        has_data: true,
        latest_period: Some(latest.period),
        latest_totals,
        period_over_period_pct,
        year_over_year_pct,
        trend: classify_trend_against(primary_now, primary_before),
        momentum: classify_momentum(&primary_series),
        correlations: correlation_table(periods, &primary_series),
        evolution: headline_evolution(periods),
    }
}

/// Pearson correlation between the primary series and each contextual
/// category series. Zero-variance pairs are `None`.
fn correlation_table(periods: &[AggregatedPeriod], primary: &[f64]) -> Vec<CorrelationEntry> {
    CrimeCategory::contextual()
        .into_iter()
        .map(|category| CorrelationEntry {
            category,
            coefficient: stats::pearson(primary, &category_series(periods, category)),
        })
        .collect()
}

/// The period sequence restricted to the headline categories.
fn headline_evolution(periods: &[AggregatedPeriod]) -> Vec<AggregatedPeriod> {
    periods
        .iter()
        .map(|p| AggregatedPeriod {
            period: p.period,
            totals: CrimeCategory::headline()
                .iter()
                .map(|c| (*c, p.total(*c)))
                .collect(),
        })
        .collect()
}
