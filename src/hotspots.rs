//! Deterministic hotspot list used when the prediction service is down.

use crate::forecast::FALLBACK_SOURCE;
use crate::types::{Hotspot, HotspotResponse, RiskTier};

/// Austin city center.
pub const BASE_LATITUDE: f64 = 30.2672;
pub const BASE_LONGITUDE: f64 = -97.7431;

pub const AREAS: [&str; 8] = [
    "Downtown Austin",
    "South Austin",
    "East Austin",
    "North Austin",
    "West Austin",
    "Mueller",
    "Zilker",
    "Barton Hills",
];

const HIGH_TIER_COUNT: usize = 3;
const LAT_STRIDE: usize = 37;
const LON_STRIDE: usize = 53;

/// Offset in degrees, within ±0.2 of the base.
fn offset(index: usize, stride: usize) -> f64 {
    ((index * stride) % 21) as f64 * 0.02 - 0.2
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

const MIN_COUNT: i64 = 1;

fn count_for(index: usize) -> u64 {
    let i = index as i64;
    (190 + (i * 7) % 11 - 15 * i).max(MIN_COUNT) as u64
}

pub fn fallback_hotspots() -> HotspotResponse {
    let hotspots = AREAS
        .iter()
        .enumerate()
        .map(|(i, label)| Hotspot {
            rank: i + 1,
            label: label.to_string(),
            latitude: round6(BASE_LATITUDE + offset(i, LAT_STRIDE)),
            longitude: round6(BASE_LONGITUDE + offset(i, LON_STRIDE)),
            count: count_for(i),
            risk_tier: if i < HIGH_TIER_COUNT {
                RiskTier::High
            } else {
                RiskTier::Medium
            },
        })
        .collect();
    HotspotResponse {
        hotspots,
        data_source: FALLBACK_SOURCE.to_string(),
    }
}
