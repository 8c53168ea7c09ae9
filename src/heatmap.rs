//! Region × year risk heatmap.
//!
//! One synchronous pass over an intake snapshot: bucket each record by
//! (region, year), total each region, derive percentile tiers from the
//! region totals only, then lay the counts out as dense matrices ordered by
//! descending region total and ascending year.

use crate::region::{hash_quadrant, infer_region, UNKNOWN_REGION};
use crate::types::{HeatmapResponse, IntakeEvent, RankedRegion, RegionTotal, RiskTier, Thresholds};
use crate::util::{percentile, year_from_text};
use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const LOW_PERCENTILE: f64 = 0.25;
pub const HIGH_PERCENTILE: f64 = 0.75;
pub const HIGH_RISK_ZONE_LIMIT: usize = 5;

/// Year bucket for an intake: parsed timestamp first, then any four-digit
/// year in the month-year text.
pub fn event_year(event: &IntakeEvent) -> Option<i32> {
    event
        .date_time
        .map(|d| d.year())
        .or_else(|| event.month_year.as_deref().and_then(year_from_text))
}

/// Region for an intake: stored label, else re-inferred from the found
/// location, else a hash quadrant of that location, else `"Unknown"`.
pub fn event_region(event: &IntakeEvent) -> String {
    let stored = event
        .region
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && *r != UNKNOWN_REGION);
    if let Some(region) = stored {
        return region.to_string();
    }
    let location = event
        .found_location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());
    match location {
        Some(loc) => infer_region(loc).unwrap_or_else(|| hash_quadrant(loc)).to_string(),
        None => UNKNOWN_REGION.to_string(),
    }
}

pub fn is_heatmap_eligible(event: &IntakeEvent) -> bool {
    let has_time = event_year(event).is_some();
    let has_place = event.region.as_deref().is_some_and(|r| !r.trim().is_empty())
        || event
            .found_location
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
    has_time && has_place
}

/// 25th/75th order-statistic percentiles over region totals.
pub fn thresholds_for<I>(totals: I) -> Thresholds
where
    I: IntoIterator<Item = u64>,
{
    let mut sorted: Vec<u64> = totals.into_iter().collect();
    sorted.sort_unstable();
    Thresholds {
        low: percentile(&sorted, LOW_PERCENTILE),
        medium: percentile(&sorted, HIGH_PERCENTILE),
    }
}

/// Inclusive on both bounds: a total equal to a threshold takes the lower tier.
pub fn tier_for(total: u64, thresholds: Thresholds) -> RiskTier {
    if total <= thresholds.low {
        RiskTier::Low
    } else if total <= thresholds.medium {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

pub fn assign_tiers(totals: &BTreeMap<String, u64>) -> (Thresholds, BTreeMap<String, RiskTier>) {
    let thresholds = thresholds_for(totals.values().copied());
    let tiers = totals
        .iter()
        .map(|(region, total)| (region.clone(), tier_for(*total, thresholds)))
        .collect();
    (thresholds, tiers)
}

pub fn build_heatmap(events: &[IntakeEvent]) -> HeatmapResponse {
    let mut cells: HashMap<String, HashMap<i32, u64>> = HashMap::new();
    let mut region_totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut skipped = 0usize;

    for event in events {
        let Some(year) = event_year(event) else {
            skipped += 1;
            continue;
        };
        let region = event_region(event);
        *cells
            .entry(region.clone())
            .or_default()
            .entry(year)
            .or_default() += 1;
        *region_totals.entry(region).or_default() += 1;
        years.insert(year);
    }
    if skipped > 0 {
        log::debug!("Heatmap: {skipped} records without a derivable year");
    }
    if region_totals.is_empty() {
        return HeatmapResponse::default();
    }

    let mut ranked: Vec<(String, u64)> = region_totals
        .iter()
        .map(|(r, t)| (r.clone(), *t))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let (thresholds, tiers) = assign_tiers(&region_totals);
    let years: Vec<i32> = years.into_iter().collect();

    let mut z_values = Vec::with_capacity(ranked.len());
    let mut counts_matrix = Vec::with_capacity(ranked.len());
    let mut ranked_summary = Vec::with_capacity(ranked.len());
    for (region, total) in &ranked {
        let tier = tiers.get(region).copied().unwrap_or(RiskTier::Low);
        let row = cells.get(region);
        counts_matrix.push(
            years
                .iter()
                .map(|y| row.and_then(|r| r.get(y)).copied().unwrap_or(0))
                .collect::<Vec<u64>>(),
        );
        z_values.push(vec![tier.value(); years.len()]);
        ranked_summary.push(RankedRegion {
            label: region.clone(),
            total: *total,
            risk: tier,
        });
    }

    let mut by_tier: Vec<&RankedRegion> = ranked_summary.iter().collect();
    by_tier.sort_by(|a, b| b.risk.cmp(&a.risk).then_with(|| b.total.cmp(&a.total)));
    let high_risk_zones = by_tier
        .into_iter()
        .take(HIGH_RISK_ZONE_LIMIT)
        .map(|r| RegionTotal {
            label: r.label.clone(),
            total: r.total,
        })
        .collect();

    HeatmapResponse {
        years,
        regions: ranked.into_iter().map(|(r, _)| r).collect(),
        z_values,
        counts_matrix,
        thresholds,
        region_totals,
        high_risk_zones,
        ranked_summary,
    }
}
