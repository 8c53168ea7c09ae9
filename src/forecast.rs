//! Local adoption forecast used when the prediction service is unavailable.
//!
//! Twelve monthly points after a given day: a historical monthly average
//! (or a floor derived from total volume) scaled by a fixed seasonal curve.
//! Everything is a pure function of the outcome snapshot and `today`, so two
//! runs over the same data serialize to the same bytes.

use crate::types::{Confidence, ForecastPoint, ForecastResponse, OutcomeEvent};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

pub const FALLBACK_SOURCE: &str = "fallback";
pub const HORIZON_MONTHS: u32 = 12;
pub const MIN_PREDICTION: u64 = 10;
const MIN_BASE: f64 = 50.0;

/// Multiplier per calendar month, January first.
pub const SEASONAL_MULTIPLIERS: [f64; 12] = [
    0.85, 0.90, 1.05, 1.10, 1.15, 0.95, 0.85, 0.90, 1.05, 1.10, 1.00, 0.95,
];

/// `month` is 1-based.
pub fn seasonal_factor(month: u32) -> f64 {
    let idx = (month.clamp(1, 12) - 1) as usize;
    SEASONAL_MULTIPLIERS[idx]
}

/// Synthetic ±2% wobble keyed on the period index. Carries no signal; kept
/// so fallback output matches what dashboards already plot.
pub fn synthetic_adjustment(index: u32) -> f64 {
    1.0 + ((index % 3) as f64 - 1.0) * 0.02
}

pub fn confidence_for(total_adoptions: u64) -> (Confidence, f64) {
    match total_adoptions {
        n if n >= 1000 => (Confidence::High, 0.85),
        n if n >= 500 => (Confidence::Medium, 0.75),
        _ => (Confidence::Low, 0.65),
    }
}

#[derive(Debug, Default)]
struct MonthHistory {
    adoptions: u64,
    years: BTreeSet<i32>,
}

impl MonthHistory {
    fn average(&self) -> Option<f64> {
        if self.years.is_empty() {
            None
        } else {
            Some(self.adoptions as f64 / self.years.len() as f64)
        }
    }
}

/// `(year, month)` of the `offset`-th month after `today`'s month.
fn month_after(today: NaiveDate, offset: u32) -> (i32, u32) {
    let idx = today.year() * 12 + today.month0() as i32 + offset as i32;
    (idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn fallback_forecast(outcomes: &[OutcomeEvent], today: NaiveDate) -> ForecastResponse {
    let total_outcomes = outcomes.len() as u64;
    let mut total_adoptions = 0u64;
    let mut by_month: BTreeMap<u32, MonthHistory> = BTreeMap::new();

    for event in outcomes.iter().filter(|e| e.is_adoption()) {
        total_adoptions += 1;
        if let Some(dt) = event.date_time {
            let entry = by_month.entry(dt.month()).or_default();
            entry.adoptions += 1;
            entry.years.insert(dt.year());
        }
    }

    let default_base = MIN_BASE.max(total_adoptions as f64 / 12.0);
    let forecast = (0..HORIZON_MONTHS)
        .map(|i| {
            let (year, month) = month_after(today, i + 1);
            let historical = by_month.get(&month).and_then(MonthHistory::average);
            let base = historical.unwrap_or(default_base);
            let factor = seasonal_factor(month);
            let raw = (base * factor * synthetic_adjustment(i)).floor();
            ForecastPoint {
                period: format!("{year:04}-{month:02}"),
                predicted_value: (raw.max(0.0) as u64).max(MIN_PREDICTION),
                seasonal_factor: factor,
                historical_average: historical.map(round2),
            }
        })
        .collect();

    let (confidence, accuracy) = confidence_for(total_adoptions);
    ForecastResponse {
        forecast,
        accuracy,
        confidence,
        data_source: FALLBACK_SOURCE.to_string(),
        total_outcomes: Some(total_outcomes),
        total_adoptions: Some(total_adoptions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn outcome(id: usize, kind: &str, when: Option<(i32, u32)>) -> OutcomeEvent {
        let date_time: Option<NaiveDateTime> = when.and_then(|(y, m)| {
            NaiveDate::from_ymd_opt(y, m, 15).and_then(|d| d.and_hms_opt(12, 0, 0))
        });
        OutcomeEvent {
            animal_id: format!("A{id}"),
            name: None,
            date_time,
            month_year: None,
            date_of_birth: None,
            outcome_type: Some(kind.to_string()),
            outcome_subtype: None,
            animal_type: Some("Dog".to_string()),
            sex: None,
            age: None,
            breed: None,
            color: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn zero_adoptions_still_forecast_twelve_points() {
        let outcomes = vec![outcome(1, "Transfer", Some((2020, 1))), outcome(2, "Euthanasia", None)];
        let resp = fallback_forecast(&outcomes, day(2024, 3, 1));
        assert_eq!(resp.forecast.len(), 12);
        assert!(resp.forecast.iter().all(|p| p.predicted_value >= MIN_PREDICTION));
        assert!(resp.forecast.iter().all(|p| p.historical_average.is_none()));
        assert_eq!(resp.confidence, Confidence::Low);
        assert_eq!(resp.accuracy, 0.65);
        assert_eq!(resp.total_outcomes, Some(2));
        assert_eq!(resp.total_adoptions, Some(0));
        assert_eq!(resp.data_source, "fallback");

        let empty = fallback_forecast(&[], day(2024, 3, 1));
        assert_eq!(empty.forecast.len(), 12);
        assert!(empty.forecast.iter().all(|p| p.predicted_value >= MIN_PREDICTION));
    }

    #[test]
    fn periods_start_after_today_and_roll_over_the_year() {
        let resp = fallback_forecast(&[], day(2024, 11, 15));
        let periods: Vec<&str> = resp.forecast.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods.first(), Some(&"2024-12"));
        assert_eq!(periods.get(1), Some(&"2025-01"));
        assert_eq!(periods.last(), Some(&"2025-11"));
        assert_eq!(resp.forecast[1].seasonal_factor, 0.85);
    }

    #[test]
    fn uses_monthly_history_when_present() {
        let mut outcomes = Vec::new();
        for i in 0..200 {
            outcomes.push(outcome(i, "Adoption", Some((2019, 5))));
        }
        for i in 200..300 {
            outcomes.push(outcome(i, "adoption", Some((2020, 5))));
        }
        let resp = fallback_forecast(&outcomes, day(2024, 4, 10));
        let may = &resp.forecast[0];
        assert_eq!(may.period, "2024-05");
        assert_eq!(may.historical_average, Some(150.0));
        // 150 * 1.15 * 0.98
        assert_eq!(may.predicted_value, 169);

        // No June history: base is max(50, 300 / 12) = 50.
        let june = &resp.forecast[1];
        assert_eq!(june.historical_average, None);
        assert_eq!(june.predicted_value, 47);
    }

    #[test]
    fn confidence_follows_adoption_volume() {
        assert_eq!(confidence_for(0), (Confidence::Low, 0.65));
        assert_eq!(confidence_for(499), (Confidence::Low, 0.65));
        assert_eq!(confidence_for(500), (Confidence::Medium, 0.75));
        assert_eq!(confidence_for(1000), (Confidence::High, 0.85));
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let outcomes: Vec<OutcomeEvent> = (0..700)
            .map(|i| {
                let kind = if i % 4 == 0 { "Transfer" } else { "Adoption" };
                let when = (i % 5 != 0).then(|| (2015 + (i % 6) as i32, (i % 12) as u32 + 1));
                outcome(i, kind, when)
            })
            .collect();
        let today = day(2024, 6, 30);
        let first = serde_json::to_string(&fallback_forecast(&outcomes, today)).unwrap();
        for _ in 0..5 {
            let again = serde_json::to_string(&fallback_forecast(&outcomes, today)).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn adjustment_cycles_every_three_periods() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        assert!(close(synthetic_adjustment(0), 0.98));
        assert!(close(synthetic_adjustment(1), 1.0));
        assert!(close(synthetic_adjustment(2), 1.02));
        assert!(close(synthetic_adjustment(3), 0.98));
    }
}
