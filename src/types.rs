use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Which kind of shelter event a file (and every record in it) describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Intake,
    Outcome,
}

impl RecordKind {
    /// Classify an upload by its filename: `*intake*` or `*outcome*`,
    /// case-insensitive. A name matching both (or neither) is ambiguous and
    /// yields `None`.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        match (lower.contains("intake"), lower.contains("outcome")) {
            (true, false) => Some(Self::Intake),
            (false, true) => Some(Self::Outcome),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Outcome => write!(f, "outcome"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeEvent {
    pub animal_id: String,
    pub name: Option<String>,
    /// `None` when no date-like field could be parsed.
    pub date_time: Option<NaiveDateTime>,
    pub month_year: Option<String>,
    pub found_location: Option<String>,
    /// Inferred at ingestion; `None` when no rule matched.
    pub region: Option<String>,
    pub intake_type: Option<String>,
    pub intake_condition: Option<String>,
    pub animal_type: Option<String>,
    pub sex: Option<String>,
    pub age: Option<String>,
    pub breed: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEvent {
    pub animal_id: String,
    pub name: Option<String>,
    pub date_time: Option<NaiveDateTime>,
    pub month_year: Option<String>,
    pub date_of_birth: Option<String>,
    pub outcome_type: Option<String>,
    pub outcome_subtype: Option<String>,
    pub animal_type: Option<String>,
    pub sex: Option<String>,
    pub age: Option<String>,
    pub breed: Option<String>,
    pub color: Option<String>,
}

impl OutcomeEvent {
    pub fn is_adoption(&self) -> bool {
        self.outcome_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains("adopt"))
    }
}

/// Relative risk of a region, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskTier {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// 25th percentile of region totals.
    pub low: u64,
    /// 75th percentile of region totals.
    pub medium: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTotal {
    pub label: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRegion {
    pub label: String,
    pub total: u64,
    pub risk: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResponse {
    pub years: Vec<i32>,
    pub regions: Vec<String>,
    /// Risk tier (1..=3) per cell, row-major by `regions` then `years`.
    pub z_values: Vec<Vec<u8>>,
    pub counts_matrix: Vec<Vec<u64>>,
    pub thresholds: Thresholds,
    pub region_totals: BTreeMap<String, u64>,
    pub high_risk_zones: Vec<RegionTotal>,
    pub ranked_summary: Vec<RankedRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// `YYYY-MM`.
    pub period: String,
    pub predicted_value: u64,
    pub seasonal_factor: f64,
    pub historical_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub forecast: Vec<ForecastPoint>,
    pub accuracy: f64,
    pub confidence: Confidence,
    pub data_source: String,
    /// Only known when the forecast was computed locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_outcomes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_adoptions: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub rank: usize,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub count: u64,
    pub risk_tier: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotResponse {
    pub hotspots: Vec<Hotspot>,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStatus {
    pub intake_records: usize,
    pub outcome_records: usize,
    pub unparsed_dates: usize,
    pub intakes_without_region: usize,
    pub ready: bool,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionSummaryRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "Risk")]
    #[tabled(rename = "Risk")]
    pub risk: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForecastRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Predicted")]
    #[tabled(rename = "Predicted")]
    pub predicted: String,
    #[serde(rename = "SeasonalFactor")]
    #[tabled(rename = "SeasonalFactor")]
    pub seasonal_factor: String,
    #[serde(rename = "HistoricalAvg")]
    #[tabled(rename = "HistoricalAvg")]
    pub historical_average: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HotspotRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Area")]
    #[tabled(rename = "Area")]
    pub label: String,
    #[serde(rename = "Latitude")]
    #[tabled(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    #[tabled(rename = "Longitude")]
    pub longitude: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: String,
    #[serde(rename = "Risk")]
    #[tabled(rename = "Risk")]
    pub risk: String,
}
