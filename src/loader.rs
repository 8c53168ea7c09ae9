use crate::columns::{CanonicalRecord, ColumnMap, Field, ALIASES};
use crate::region::infer_region;
use crate::store::{EventBatch, RecordStore, StoreError};
use crate::types::{IntakeEvent, OutcomeEvent, RecordKind};
use crate::util::parse_event_date;
use chrono::NaiveDateTime;
use csv::{Reader, ReaderBuilder, StringRecordsIntoIter};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;

/// Date-like fields in the order they are consulted.
const DATE_CANDIDATES: [Field; 2] = [Field::DateTime, Field::MonthYear];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(
        "Cannot tell whether {} holds intakes or outcomes (expected 'intake' or 'outcome' in the file name)",
        path.display()
    )]
    Unclassifiable { path: PathBuf },

    #[error("{} has no '{field}' column", path.display())]
    MissingColumn { path: PathBuf, field: Field },

    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    fn at(self, path: &Path) -> Self {
        match self {
            Self::MissingColumn { field, .. } => Self::MissingColumn {
                path: path.to_path_buf(),
                field,
            },
            e => e,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub kind: RecordKind,
    pub total_rows: usize,
    /// Records the store acknowledged, summed across batches.
    pub written: usize,
    pub row_errors: usize,
    pub unparsed_dates: usize,
    pub without_region: usize,
    pub failed_batches: usize,
}

impl LoadReport {
    fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            total_rows: 0,
            written: 0,
            row_errors: 0,
            unparsed_dates: 0,
            without_region: 0,
            failed_batches: 0,
        }
    }
}

/// A file that passed every upload-level check: its name classifies it and
/// its header row carries the required columns. Rows are not read yet.
pub struct PreparedFile {
    pub path: PathBuf,
    pub kind: RecordKind,
    reader: Reader<File>,
    columns: ColumnMap,
}

pub fn classify_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, RecordKind)>, IngestError> {
    paths
        .iter()
        .map(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            RecordKind::from_filename(name)
                .map(|kind| (path.clone(), kind))
                .ok_or_else(|| IngestError::Unclassifiable { path: path.clone() })
        })
        .collect()
}

/// Classify, open and header-check every path before anything is written,
/// so one bad file rejects the whole upload.
pub fn prepare_files(paths: &[PathBuf]) -> Result<Vec<PreparedFile>, IngestError> {
    classify_files(paths)?
        .into_iter()
        .map(|(path, kind)| {
            let file = File::open(&path).map_err(|source| IngestError::Open {
                path: path.clone(),
                source,
            })?;
            let mut reader = csv_reader(file);
            let columns = required_columns(&mut reader).map_err(|e| e.at(&path))?;
            Ok(PreparedFile {
                path,
                kind,
                reader,
                columns,
            })
        })
        .collect()
}

pub async fn ingest_files(
    store: &dyn RecordStore,
    paths: &[PathBuf],
    opts: &LoadOptions,
) -> Result<Vec<LoadReport>, IngestError> {
    let prepared = prepare_files(paths)?;
    let mut reports = Vec::with_capacity(prepared.len());
    for file in prepared {
        reports.push(ingest_prepared(store, file, opts).await);
    }
    Ok(reports)
}

/// Past validation nothing is fatal: unreadable rows become row errors.
async fn ingest_prepared(store: &dyn RecordStore, file: PreparedFile, opts: &LoadOptions) -> LoadReport {
    let start = Instant::now();
    let PreparedFile {
        path,
        kind,
        reader,
        columns,
    } = file;
    let report = ingest_records(store, reader, columns, kind, opts).await;
    log::info!(
        "{}: {} {} rows, {} written, {} row errors, {} unparsed dates ({:.1}s)",
        path.display(),
        report.total_rows,
        kind,
        report.written,
        report.row_errors,
        report.unparsed_dates,
        start.elapsed().as_secs_f64(),
    );
    report
}

fn csv_reader<R: Read>(reader: R) -> Reader<R> {
    ReaderBuilder::new().flexible(true).from_reader(reader)
}

fn required_columns<R: Read>(rdr: &mut Reader<R>) -> Result<ColumnMap, IngestError> {
    let columns = ColumnMap::from_csv_headers(rdr.headers()?, ALIASES);
    match Field::ALL.into_iter().find(|f| f.is_required() && !columns.contains(*f)) {
        Some(field) => Err(IngestError::MissingColumn {
            path: PathBuf::new(),
            field,
        }),
        None => Ok(columns),
    }
}

/// Normalize every row of `reader` as `kind` and write the result in
/// concurrent batches. Rows that fail validation are skipped and counted;
/// a failed batch contributes whatever it managed to write.
pub async fn ingest_reader<R: Read>(
    store: &dyn RecordStore,
    reader: R,
    kind: RecordKind,
    opts: &LoadOptions,
) -> Result<LoadReport, IngestError> {
    let mut rdr = csv_reader(reader);
    let columns = required_columns(&mut rdr)?;
    Ok(ingest_records(store, rdr, columns, kind, opts).await)
}

async fn ingest_records<R: Read>(
    store: &dyn RecordStore,
    rdr: Reader<R>,
    columns: ColumnMap,
    kind: RecordKind,
    opts: &LoadOptions,
) -> LoadReport {
    let mut batches = BatchReader::new(rdr, columns, kind, opts.batch_size);
    let (written, failed) =
        write_batches(store, batches.by_ref(), opts.max_concurrent_batches).await;
    let mut report = batches.report;
    report.written = written;
    report.failed_batches = failed;
    report
}

/// Pulls rows on demand and yields them as fixed-size batches, so at most
/// the in-flight batches are held in memory.
struct BatchReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: ColumnMap,
    kind: RecordKind,
    batch_size: usize,
    report: LoadReport,
}

impl<R: Read> BatchReader<R> {
    fn new(rdr: Reader<R>, columns: ColumnMap, kind: RecordKind, batch_size: usize) -> Self {
        Self {
            records: rdr.into_records(),
            columns,
            kind,
            batch_size: batch_size.max(1),
            report: LoadReport::new(kind),
        }
    }

    fn empty_batch(&self) -> EventBatch {
        let capacity = self.batch_size.min(1024);
        match self.kind {
            RecordKind::Intake => EventBatch::Intake(Vec::with_capacity(capacity)),
            RecordKind::Outcome => EventBatch::Outcome(Vec::with_capacity(capacity)),
        }
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = EventBatch;

    fn next(&mut self) -> Option<EventBatch> {
        let mut batch = self.empty_batch();
        while batch.len() < self.batch_size {
            let Some(result) = self.records.next() else {
                break;
            };
            self.report.total_rows += 1;
            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("Skipping malformed row {}: {e}", self.report.total_rows);
                    self.report.row_errors += 1;
                    continue;
                }
            };
            let rec = self.columns.normalize(&row);
            if let Some(field) = rec.missing_required() {
                log::debug!("Skipping row {}: missing {field}", self.report.total_rows);
                self.report.row_errors += 1;
                continue;
            }

            let date_time = event_date(&rec);
            if date_time.is_none() {
                self.report.unparsed_dates += 1;
            }
            match &mut batch {
                EventBatch::Intake(events) => {
                    let event = build_intake(&rec, date_time);
                    if event.region.is_none() {
                        self.report.without_region += 1;
                    }
                    events.push(event);
                }
                EventBatch::Outcome(events) => events.push(build_outcome(&rec, date_time)),
            }
        }
        (!batch.is_empty()).then_some(batch)
    }
}

/// Fan out batches as the reader produces them, with at most
/// `max_in_flight` writes pending, then sum the acknowledged counts.
/// Returns `(written, failed_batches)`.
async fn write_batches<I>(store: &dyn RecordStore, batches: I, max_in_flight: usize) -> (usize, usize)
where
    I: Iterator<Item = EventBatch>,
{
    let results: Vec<(usize, usize, Result<usize, StoreError>)> =
        stream::iter(batches.enumerate())
            .map(|(idx, batch)| async move {
                let len = batch.len();
                (idx, len, store.insert(batch).await)
            })
            .buffer_unordered(max_in_flight.max(1))
            .collect()
            .await;

    let mut written = 0usize;
    let mut failed = 0usize;
    for (idx, len, result) in results {
        match result {
            Ok(n) => {
                log::debug!("Batch {idx}: wrote {n}/{len}");
                written += n;
            }
            Err(StoreError::Write {
                written: partial,
                message,
            }) => {
                log::warn!("Batch {idx}: wrote {partial}/{len} before failing: {message}");
                written += partial;
                failed += 1;
            }
            Err(e) => {
                log::warn!("Batch {idx}: {e}");
                failed += 1;
            }
        }
    }
    (written, failed)
}

/// Parse the first non-empty date-like field. A present but unparsable
/// value does not fall through to later candidates.
fn event_date(rec: &CanonicalRecord) -> Option<NaiveDateTime> {
    DATE_CANDIDATES
        .iter()
        .find_map(|f| rec.get(*f))
        .and_then(|raw| parse_event_date(Some(raw)))
}

fn build_intake(rec: &CanonicalRecord, date_time: Option<NaiveDateTime>) -> IntakeEvent {
    let found_location = rec.owned(Field::FoundLocation);
    let region = found_location
        .as_deref()
        .and_then(infer_region)
        .map(str::to_string);
    IntakeEvent {
        animal_id: rec.owned(Field::AnimalId).unwrap_or_default(),
        name: rec.owned(Field::Name),
        date_time,
        month_year: rec.owned(Field::MonthYear),
        found_location,
        region,
        intake_type: rec.owned(Field::IntakeType),
        intake_condition: rec.owned(Field::IntakeCondition),
        animal_type: rec.owned(Field::AnimalType),
        sex: rec.owned(Field::Sex),
        age: rec.owned(Field::Age),
        breed: rec.owned(Field::Breed),
        color: rec.owned(Field::Color),
    }
}

fn build_outcome(rec: &CanonicalRecord, date_time: Option<NaiveDateTime>) -> OutcomeEvent {
    OutcomeEvent {
        animal_id: rec.owned(Field::AnimalId).unwrap_or_default(),
        name: rec.owned(Field::Name),
        date_time,
        month_year: rec.owned(Field::MonthYear),
        date_of_birth: rec.owned(Field::DateOfBirth),
        outcome_type: rec.owned(Field::OutcomeType),
        outcome_subtype: rec.owned(Field::OutcomeSubtype),
        animal_type: rec.owned(Field::AnimalType),
        sex: rec.owned(Field::Sex),
        age: rec.owned(Field::Age),
        breed: rec.owned(Field::Breed),
        color: rec.owned(Field::Color),
    }
}
