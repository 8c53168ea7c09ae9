//! Client for the external prediction service.
//!
//! The service speaks its own JSON dialect (`ds`/`yhat` series, snake_case
//! cluster records). Payloads are decoded into private wire structs and
//! converted to the crate's response types; anything that cannot be
//! converted is a [`ServiceError`], which callers turn into a fallback.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{Confidence, ForecastPoint, ForecastResponse, Hotspot, HotspotResponse, RiskTier};

pub const TRENDS_PATH: &str = "/api/v1/predictions/trends";
pub const HOTSPOTS_PATH: &str = "/api/v1/predictions/hotspots";
const DEFAULT_SOURCE: &str = "ml-service";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prediction service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Prediction service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Well-formed response that carries an error or no data.
    #[error("Prediction service rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn forecast(&self) -> Result<ForecastResponse, ServiceError>;

    async fn hotspots(&self) -> Result<HotspotResponse, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    ds: String,
    yhat: f64,
}

#[derive(Debug, Deserialize)]
struct TrendsPayload {
    error: Option<String>,
    message: Option<String>,
    #[serde(default)]
    forecast: Vec<TrendPoint>,
    #[serde(default)]
    accuracy: f64,
    data_source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClusterRecord {
    cluster_id: Option<i64>,
    location: Option<String>,
    risk_level: Option<String>,
    #[serde(default)]
    animal_count: u64,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct HotspotPayload {
    error: Option<String>,
    message: Option<String>,
    #[serde(default)]
    hotspots: Vec<ClusterRecord>,
    data_source: Option<String>,
}

fn rejection(error: String, message: Option<String>) -> ServiceError {
    match message {
        Some(m) => ServiceError::Rejected(format!("{error}: {m}")),
        None => ServiceError::Rejected(error),
    }
}

pub fn confidence_from_accuracy(accuracy: f64) -> Confidence {
    if accuracy >= 0.8 {
        Confidence::High
    } else if accuracy >= 0.7 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn risk_from_level(level: Option<&str>) -> RiskTier {
    match level.map(str::to_lowercase).as_deref() {
        Some("high") => RiskTier::High,
        Some("low") => RiskTier::Low,
        _ => RiskTier::Medium,
    }
}

impl TrendsPayload {
    fn into_forecast(self) -> Result<ForecastResponse, ServiceError> {
        if let Some(error) = self.error {
            return Err(rejection(error, self.message));
        }
        if self.forecast.is_empty() {
            return Err(ServiceError::Rejected("empty forecast series".to_string()));
        }
        let forecast = self
            .forecast
            .into_iter()
            .map(|p| ForecastPoint {
                period: p.ds,
                predicted_value: p.yhat.max(0.0).round() as u64,
                seasonal_factor: 1.0,
                historical_average: None,
            })
            .collect();
        Ok(ForecastResponse {
            forecast,
            accuracy: self.accuracy,
            confidence: confidence_from_accuracy(self.accuracy),
            data_source: self
                .data_source
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            total_outcomes: None,
            total_adoptions: None,
        })
    }
}

impl HotspotPayload {
    fn into_hotspots(self) -> Result<HotspotResponse, ServiceError> {
        if let Some(error) = self.error {
            return Err(rejection(error, self.message));
        }
        if self.hotspots.is_empty() {
            return Err(ServiceError::Rejected("no hotspot clusters".to_string()));
        }
        let hotspots = self
            .hotspots
            .into_iter()
            .enumerate()
            .map(|(i, c)| Hotspot {
                rank: i + 1,
                label: c
                    .location
                    .unwrap_or_else(|| format!("Cluster {}", c.cluster_id.unwrap_or(i as i64))),
                latitude: c.latitude,
                longitude: c.longitude,
                count: c.animal_count,
                risk_tier: risk_from_level(c.risk_level.as_deref()),
            })
            .collect();
        Ok(HotspotResponse {
            hotspots,
            data_source: self
                .data_source
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        })
    }
}

/// `reqwest`-backed client. The request timeout matches the caller's so a
/// stalled connection is torn down rather than left behind.
pub struct HttpPredictionService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPredictionService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_body(&self, path: &str) -> Result<String, ServiceError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url}");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn forecast(&self) -> Result<ForecastResponse, ServiceError> {
        let body = self.get_body(TRENDS_PATH).await?;
        let payload: TrendsPayload = serde_json::from_str(&body)?;
        payload.into_forecast()
    }

    async fn hotspots(&self) -> Result<HotspotResponse, ServiceError> {
        let body = self.get_body(HOTSPOTS_PATH).await?;
        let payload: HotspotPayload = serde_json::from_str(&body)?;
        payload.into_hotspots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trends(json: &str) -> Result<ForecastResponse, ServiceError> {
        let payload: TrendsPayload = serde_json::from_str(json)?;
        payload.into_forecast()
    }

    fn clusters(json: &str) -> Result<HotspotResponse, ServiceError> {
        let payload: HotspotPayload = serde_json::from_str(json)?;
        payload.into_hotspots()
    }

    #[test]
    fn decodes_trend_series() {
        let resp = trends(
            r#"{"prediction_type":"adoption_trends",
                "forecast":[{"ds":"2025-01","yhat":152},{"ds":"2025-02","yhat":160.6}],
                "accuracy":0.85,"data_source":"uploaded_data_fast"}"#,
        )
        .unwrap();
        assert_eq!(resp.forecast.len(), 2);
        assert_eq!(resp.forecast[0].period, "2025-01");
        assert_eq!(resp.forecast[1].predicted_value, 161);
        assert_eq!(resp.confidence, Confidence::High);
        assert_eq!(resp.data_source, "uploaded_data_fast");
        assert_eq!(resp.total_outcomes, None);
    }

    #[test]
    fn error_payloads_are_failures() {
        let err = trends(
            r#"{"error":"No uploaded data found","forecast":[],"accuracy":0.0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(m) if m.contains("No uploaded data")));

        assert!(matches!(
            trends(r#"{"forecast":[],"accuracy":0.9}"#),
            Err(ServiceError::Rejected(_))
        ));
        assert!(matches!(trends("not json"), Err(ServiceError::Json(_))));
    }

    #[test]
    fn decodes_cluster_records() {
        let resp = clusters(
            r#"{"hotspots":[
                {"cluster_id":0,"location":"Austin (TX)","risk_level":"High","animal_count":412,
                 "priority":"High","latitude":30.28,"longitude":-97.75},
                {"cluster_id":1,"risk_level":"Medium","animal_count":37,
                 "latitude":30.21,"longitude":-97.70}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.hotspots.len(), 2);
        assert_eq!(resp.hotspots[0].risk_tier, RiskTier::High);
        assert_eq!(resp.hotspots[0].count, 412);
        assert_eq!(resp.hotspots[1].label, "Cluster 1");
        assert_eq!(resp.hotspots[1].rank, 2);
        assert_eq!(resp.data_source, "ml-service");

        assert!(clusters(r#"{"error":"No uploaded data found","hotspots":[]}"#).is_err());
    }

    #[test]
    fn accuracy_bands() {
        assert_eq!(confidence_from_accuracy(0.92), Confidence::High);
        assert_eq!(confidence_from_accuracy(0.75), Confidence::Medium);
        assert_eq!(confidence_from_accuracy(0.0), Confidence::Low);
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let svc = HttpPredictionService::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        assert!(svc.forecast().await.is_err());
        assert!(svc.hotspots().await.is_err());
    }
}
