//! Request-level entry points over a [`RecordStore`].
//!
//! Each call reads one snapshot from the store and aggregates it in a single
//! synchronous pass. Forecasts and hotspots first ask the prediction service
//! (if one is configured) under a fixed timeout; any failure is logged and
//! the local fallback is returned instead.

use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DEFAULT_ML_TIMEOUT;
use crate::forecast::fallback_forecast;
use crate::heatmap::build_heatmap;
use crate::hotspots::fallback_hotspots;
use crate::service::{PredictionService, ServiceError};
use crate::store::{RecordStore, StoreError};
use crate::types::{DataStatus, ForecastResponse, HeatmapResponse, HotspotResponse, IntakeEvent, OutcomeEvent};

pub struct Analytics {
    store: Arc<dyn RecordStore>,
    service: Option<Arc<dyn PredictionService>>,
    timeout: Duration,
}

impl Analytics {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            service: None,
            timeout: DEFAULT_ML_TIMEOUT,
        }
    }

    pub fn with_service(mut self, service: Arc<dyn PredictionService>, timeout: Duration) -> Self {
        self.service = Some(service);
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn heatmap(&self) -> Result<HeatmapResponse, StoreError> {
        let intakes = self.store.heatmap_intakes().await?;
        Ok(build_heatmap(&intakes))
    }

    /// Remote forecast, else the local one for the twelve months after `today`.
    pub async fn forecast(&self, today: NaiveDate) -> Result<ForecastResponse, StoreError> {
        if let Some(service) = &self.service {
            match self.call(service.forecast()).await {
                Ok(resp) => return Ok(resp),
                Err(e) => log::warn!("Forecast service unavailable, using fallback: {e}"),
            }
        }
        let outcomes = self.store.outcomes().await?;
        Ok(fallback_forecast(&outcomes, today))
    }

    pub async fn hotspots(&self) -> Result<HotspotResponse, StoreError> {
        if let Some(service) = &self.service {
            match self.call(service.hotspots()).await {
                Ok(resp) => return Ok(resp),
                Err(e) => log::warn!("Hotspot service unavailable, using fallback: {e}"),
            }
        }
        Ok(fallback_hotspots())
    }

    pub async fn status(&self) -> Result<DataStatus, StoreError> {
        let intakes = self.store.intakes().await?;
        let outcomes = self.store.outcomes().await?;
        Ok(data_status(&intakes, &outcomes))
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))?
    }
}

pub fn data_status(intakes: &[IntakeEvent], outcomes: &[OutcomeEvent]) -> DataStatus {
    let unparsed_dates = intakes.iter().filter(|e| e.date_time.is_none()).count()
        + outcomes.iter().filter(|e| e.date_time.is_none()).count();
    let intakes_without_region = intakes
        .iter()
        .filter(|e| e.region.as_deref().map_or(true, |r| r.trim().is_empty()))
        .count();
    DataStatus {
        intake_records: intakes.len(),
        outcome_records: outcomes.len(),
        unparsed_dates,
        intakes_without_region,
        ready: !intakes.is_empty() || !outcomes.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::intake;
    use crate::store::{EventBatch, MemoryStore};
    use crate::types::{Confidence, ForecastPoint, RiskTier};
    use async_trait::async_trait;

    enum Behavior {
        Slow,
        Fail,
        Succeed,
    }

    struct MockService(Behavior);

    fn remote_forecast() -> ForecastResponse {
        ForecastResponse {
            forecast: vec![ForecastPoint {
                period: "2025-01".to_string(),
                predicted_value: 150,
                seasonal_factor: 1.0,
                historical_average: None,
            }],
            accuracy: 0.9,
            confidence: Confidence::High,
            data_source: "ml-service".to_string(),
            total_outcomes: None,
            total_adoptions: None,
        }
    }

    #[async_trait]
    impl PredictionService for MockService {
        async fn forecast(&self) -> Result<ForecastResponse, ServiceError> {
            match self.0 {
                Behavior::Slow => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(remote_forecast())
                }
                Behavior::Fail => Err(ServiceError::Rejected("No uploaded data found".to_string())),
                Behavior::Succeed => Ok(remote_forecast()),
            }
        }

        async fn hotspots(&self) -> Result<HotspotResponse, ServiceError> {
            match self.0 {
                Behavior::Slow => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(fallback_hotspots())
                }
                Behavior::Fail => Err(ServiceError::Status {
                    status: 503,
                    body: String::new(),
                }),
                Behavior::Succeed => Ok(HotspotResponse {
                    hotspots: vec![],
                    data_source: "ml-service".to_string(),
                }),
            }
        }
    }

    fn analytics(behavior: Option<Behavior>) -> Analytics {
        let base = Analytics::new(Arc::new(MemoryStore::new()));
        match behavior {
            Some(b) => base.with_service(Arc::new(MockService(b)), Duration::from_millis(50)),
            None => base,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn timeout_falls_back() {
        let a = analytics(Some(Behavior::Slow));
        let forecast = a.forecast(today()).await.unwrap();
        assert_eq!(forecast.data_source, "fallback");
        assert_eq!(forecast.forecast.len(), 12);

        let hotspots = a.hotspots().await.unwrap();
        assert_eq!(hotspots.data_source, "fallback");
        assert_eq!(hotspots.hotspots.len(), 8);
    }

    #[tokio::test]
    async fn service_errors_fall_back() {
        let a = analytics(Some(Behavior::Fail));
        assert_eq!(a.forecast(today()).await.unwrap().data_source, "fallback");
        assert_eq!(a.hotspots().await.unwrap().hotspots[0].risk_tier, RiskTier::High);
    }

    #[tokio::test]
    async fn healthy_service_is_used() {
        let a = analytics(Some(Behavior::Succeed));
        let forecast = a.forecast(today()).await.unwrap();
        assert_eq!(forecast, remote_forecast());
        assert_eq!(a.hotspots().await.unwrap().data_source, "ml-service");
    }

    #[tokio::test]
    async fn no_service_means_fallback() {
        let a = analytics(None);
        let forecast = a.forecast(today()).await.unwrap();
        assert_eq!(forecast.data_source, "fallback");
        assert_eq!(forecast.forecast[0].period, "2024-07");
    }

    #[tokio::test]
    async fn heatmap_and_status_read_the_store() {
        let a = analytics(None);
        let mut placed = intake("A1", Some("1100 E 12th St 78702"), Some(2020));
        placed.region = Some("East Austin".to_string());
        a.store()
            .insert(EventBatch::Intake(vec![
                placed,
                intake("A2", Some("Austin (TX)"), None),
                intake("A3", None, Some(2021)),
            ]))
            .await
            .unwrap();

        let heatmap = a.heatmap().await.unwrap();
        assert_eq!(heatmap.years, vec![2020]);
        assert_eq!(heatmap.regions, vec!["East Austin"]);

        let status = a.status().await.unwrap();
        assert_eq!(status.intake_records, 3);
        assert_eq!(status.outcome_records, 0);
        assert_eq!(status.unparsed_dates, 1);
        assert_eq!(status.intakes_without_region, 2);
        assert!(status.ready);
    }

    #[tokio::test]
    async fn empty_store_is_not_an_error() {
        let a = analytics(None);
        let heatmap = a.heatmap().await.unwrap();
        assert!(heatmap.regions.is_empty());
        let status = a.status().await.unwrap();
        assert!(!status.ready);
    }
}
