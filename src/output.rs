use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use crate::reports::region_rows;
use crate::types::{DataStatus, ForecastResponse, HeatmapResponse, HotspotResponse};

pub const HEATMAP_FILE: &str = "heatmap.json";
pub const FORECAST_FILE: &str = "forecast.json";
pub const HOTSPOTS_FILE: &str = "hotspots.json";
pub const REGION_SUMMARY_FILE: &str = "region_summary.csv";
pub const STATUS_FILE: &str = "status.json";

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything one `report` run produces.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub heatmap: HeatmapResponse,
    pub forecast: ForecastResponse,
    pub hotspots: HotspotResponse,
    pub status: DataStatus,
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.display().to_string(),
        source,
    })
}

/// Write every artifact into `dir`, creating it if needed. Returns the
/// paths written, in a stable order.
pub fn write_reports(dir: &Path, bundle: &ReportBundle) -> Result<Vec<PathBuf>, OutputError> {
    ensure_dir(dir)?;
    let heatmap = dir.join(HEATMAP_FILE);
    write_json(&heatmap, &bundle.heatmap)?;
    let summary = dir.join(REGION_SUMMARY_FILE);
    write_csv(&summary, &region_rows(&bundle.heatmap))?;
    let forecast = dir.join(FORECAST_FILE);
    write_json(&forecast, &bundle.forecast)?;
    let hotspots = dir.join(HOTSPOTS_FILE);
    write_json(&hotspots, &bundle.hotspots)?;
    let status = dir.join(STATUS_FILE);
    write_json(&status, &bundle.status)?;
    Ok(vec![heatmap, summary, forecast, hotspots, status])
}

/// Write a single JSON artifact into `dir`.
pub fn write_artifact<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<PathBuf, OutputError> {
    ensure_dir(dir)?;
    let path = dir.join(file);
    write_json(&path, value)?;
    Ok(path)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
