use crate::types::{
    ForecastResponse, ForecastRow, HeatmapResponse, HotspotResponse, HotspotRow, RegionSummaryRow,
};
use crate::util::{format_int, format_number};

/// One row per region, in heatmap rank order (total desc).
pub fn region_rows(heatmap: &HeatmapResponse) -> Vec<RegionSummaryRow> {
    heatmap
        .ranked_summary
        .iter()
        .enumerate()
        .map(|(i, r)| RegionSummaryRow {
            rank: i + 1,
            region: r.label.clone(),
            total: format_int(r.total),
            risk: r.risk.to_string(),
        })
        .collect()
}

pub fn forecast_rows(forecast: &ForecastResponse) -> Vec<ForecastRow> {
    forecast
        .forecast
        .iter()
        .map(|p| ForecastRow {
            period: p.period.clone(),
            predicted: format_int(p.predicted_value),
            seasonal_factor: format_number(p.seasonal_factor, 2),
            historical_average: p
                .historical_average
                .map(|v| format_number(v, 2))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn hotspot_rows(hotspots: &HotspotResponse) -> Vec<HotspotRow> {
    hotspots
        .hotspots
        .iter()
        .map(|h| HotspotRow {
            rank: h.rank,
            label: h.label.clone(),
            latitude: format!("{:.6}", h.latitude),
            longitude: format!("{:.6}", h.longitude),
            count: format_int(h.count),
            risk: h.risk_tier.to_string(),
        })
        .collect()
}
