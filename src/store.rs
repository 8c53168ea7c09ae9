//! Record persistence seam.
//!
//! The loader writes batches through [`RecordStore`] and every aggregation
//! reads one snapshot from it per request. [`MemoryStore`] is the in-process
//! implementation used by the CLI and the tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::heatmap::is_heatmap_eligible;
use crate::types::{IntakeEvent, OutcomeEvent, RecordKind};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A batch write failed part way; `written` records made it in.
    #[error("Batch write failed after {written} records: {message}")]
    Write { written: usize, message: String },

    #[error("Store read failed: {0}")]
    Read(String),
}

/// One write unit handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum EventBatch {
    Intake(Vec<IntakeEvent>),
    Outcome(Vec<OutcomeEvent>),
}

impl EventBatch {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Intake(_) => RecordKind::Intake,
            Self::Outcome(_) => RecordKind::Outcome,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Intake(v) => v.len(),
            Self::Outcome(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a batch, returning how many records were written.
    async fn insert(&self, batch: EventBatch) -> Result<usize, StoreError>;

    async fn intakes(&self) -> Result<Vec<IntakeEvent>, StoreError>;

    async fn outcomes(&self) -> Result<Vec<OutcomeEvent>, StoreError>;

    /// Bulk-clear every record of `kind`.
    async fn clear(&self, kind: RecordKind) -> Result<(), StoreError>;

    /// Intakes that can land in a heatmap cell: a year is derivable and
    /// there is a region or a raw location to derive one from.
    async fn heatmap_intakes(&self) -> Result<Vec<IntakeEvent>, StoreError> {
        let mut all = self.intakes().await?;
        all.retain(is_heatmap_eligible);
        Ok(all)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    intakes: RwLock<Vec<IntakeEvent>>,
    outcomes: RwLock<Vec<OutcomeEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Intake => self.intakes.read().await.len(),
            RecordKind::Outcome => self.outcomes.read().await.len(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, batch: EventBatch) -> Result<usize, StoreError> {
        let n = batch.len();
        match batch {
            EventBatch::Intake(v) => self.intakes.write().await.extend(v),
            EventBatch::Outcome(v) => self.outcomes.write().await.extend(v),
        }
        Ok(n)
    }

    async fn intakes(&self) -> Result<Vec<IntakeEvent>, StoreError> {
        Ok(self.intakes.read().await.clone())
    }

    async fn outcomes(&self) -> Result<Vec<OutcomeEvent>, StoreError> {
        Ok(self.outcomes.read().await.clone())
    }

    async fn clear(&self, kind: RecordKind) -> Result<(), StoreError> {
        match kind {
            RecordKind::Intake => self.intakes.write().await.clear(),
            RecordKind::Outcome => self.outcomes.write().await.clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn intake(id: &str, location: Option<&str>, year: Option<i32>) -> IntakeEvent {
        IntakeEvent {
            animal_id: id.to_string(),
            name: None,
            date_time: year.and_then(|y| {
                chrono::NaiveDate::from_ymd_opt(y, 6, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
            month_year: None,
            found_location: location.map(str::to_string),
            region: None,
            intake_type: None,
            intake_condition: None,
            animal_type: None,
            sex: None,
            age: None,
            breed: None,
            color: None,
        }
    }

    #[tokio::test]
    async fn insert_and_clear_round_trip() {
        let store = MemoryStore::new();
        let written = store
            .insert(EventBatch::Intake(vec![
                intake("A1", Some("78702"), Some(2020)),
                intake("A2", None, None),
            ]))
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.len(RecordKind::Intake).await, 2);
        assert_eq!(store.len(RecordKind::Outcome).await, 0);

        store.clear(RecordKind::Intake).await.unwrap();
        assert!(store.intakes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn heatmap_intakes_drops_unplaceable_records() {
        let store = MemoryStore::new();
        store
            .insert(EventBatch::Intake(vec![
                intake("A1", Some("Austin (TX)"), Some(2020)),
                intake("A2", None, Some(2020)),
                intake("A3", Some("Austin (TX)"), None),
            ]))
            .await
            .unwrap();
        let eligible = store.heatmap_intakes().await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].animal_id, "A1");
    }
}
