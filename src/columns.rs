//! Header alias resolution.
//!
//! Shelter exports spell the same column many ways (`Animal ID` in the
//! Austin Animal Center dumps, `animalId` from the upload service,
//! `animal_id` from ad-hoc scripts). [`ALIASES`] lists the accepted
//! spellings per canonical [`Field`] in priority order; a [`ColumnMap`] is
//! resolved once per file from its header row and then applied to every
//! record.

use csv::StringRecord;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    AnimalId,
    Name,
    DateTime,
    MonthYear,
    DateOfBirth,
    FoundLocation,
    IntakeType,
    IntakeCondition,
    OutcomeType,
    OutcomeSubtype,
    AnimalType,
    Sex,
    Age,
    Breed,
    Color,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::AnimalId,
        Field::Name,
        Field::DateTime,
        Field::MonthYear,
        Field::DateOfBirth,
        Field::FoundLocation,
        Field::IntakeType,
        Field::IntakeCondition,
        Field::OutcomeType,
        Field::OutcomeSubtype,
        Field::AnimalType,
        Field::Sex,
        Field::Age,
        Field::Breed,
        Field::Color,
    ];

    pub fn is_required(self) -> bool {
        matches!(self, Field::AnimalId)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First alias doubles as the canonical (camelCase) name.
        write!(f, "{}", aliases_for(*self).first().copied().unwrap_or("?"))
    }
}

/// Canonical field -> accepted header spellings, highest priority first.
pub type AliasTable = [(Field, &'static [&'static str])];

pub static ALIASES: &AliasTable = &[
    (Field::AnimalId, &["animalId", "Animal ID", "animal_id"]),
    (Field::Name, &["name", "Name"]),
    (
        Field::DateTime,
        &[
            "datetime",
            "DateTime",
            "dateTime",
            "date",
            "intakeDateTime",
            "outcomeDateTime",
            "outcome_datetime",
            "timestamp",
        ],
    ),
    (Field::MonthYear, &["monthYear", "MonthYear", "month_year"]),
    (Field::DateOfBirth, &["dateOfBirth", "Date of Birth"]),
    (
        Field::FoundLocation,
        &["foundLocation", "Found Location", "found_location"],
    ),
    (Field::IntakeType, &["intakeType", "Intake Type"]),
    (Field::IntakeCondition, &["intakeCondition", "Intake Condition"]),
    (
        Field::OutcomeType,
        &["outcomeType", "Outcome Type", "outcome_type"],
    ),
    (Field::OutcomeSubtype, &["outcomeSubtype", "Outcome Subtype"]),
    (Field::AnimalType, &["animalType", "Animal Type", "animal_type"]),
    (
        Field::Sex,
        &[
            "sexUponIntake",
            "Sex upon Intake",
            "sexUponOutcome",
            "Sex upon Outcome",
        ],
    ),
    (
        Field::Age,
        &[
            "ageUponIntake",
            "Age upon Intake",
            "ageUponOutcome",
            "Age upon Outcome",
        ],
    ),
    (Field::Breed, &["breed", "Breed"]),
    (Field::Color, &["color", "Color"]),
];

pub fn aliases_for(field: Field) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, a)| *a)
        .unwrap_or(&[])
}

/// A row reduced to canonical fields. Absent and blank values are both `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    values: HashMap<Field, String>,
}

impl CanonicalRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn owned(&self, field: Field) -> Option<String> {
        self.values.get(&field).cloned()
    }

    fn set(&mut self, field: Field, raw: &str) {
        let value = raw.trim();
        if !value.is_empty() {
            self.values.insert(field, value.to_string());
        }
    }

    /// First required field that has no value.
    pub fn missing_required(&self) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.is_required() && self.get(*f).is_none())
    }
}

/// Canonical field -> column index, resolved from one header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve<'a, I>(headers: I, table: &AliasTable) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let mut indices = HashMap::new();
        for (field, aliases) in table {
            // Exact spelling wins over a case-insensitive match anywhere.
            let exact = aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias));
            let found = exact.or_else(|| {
                aliases.iter().find_map(|alias| {
                    headers.iter().position(|h| h.eq_ignore_ascii_case(alias))
                })
            });
            if let Some(idx) = found {
                indices.insert(*field, idx);
            }
        }
        Self { indices }
    }

    pub fn from_csv_headers(headers: &StringRecord, table: &AliasTable) -> Self {
        Self::resolve(headers.iter(), table)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    pub fn normalize(&self, record: &StringRecord) -> CanonicalRecord {
        let mut out = CanonicalRecord::default();
        for (field, idx) in &self.indices {
            if let Some(raw) = record.get(*idx) {
                out.set(*field, raw);
            }
        }
        out
    }
}

/// Normalize a single header -> value mapping without a pre-resolved
/// [`ColumnMap`]. Useful for rows that arrive as JSON objects.
pub fn normalize_row(row: &HashMap<String, String>, table: &AliasTable) -> CanonicalRecord {
    let headers: Vec<&str> = row.keys().map(String::as_str).collect();
    let map = ColumnMap::resolve(headers.iter().copied(), table);
    let values: StringRecord = headers
        .iter()
        .map(|h| row.get(*h).map(String::as_str).unwrap_or(""))
        .collect();
    map.normalize(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn austin_headers() -> StringRecord {
        StringRecord::from(vec![
            "Animal ID",
            "Name",
            "DateTime",
            "MonthYear",
            "Found Location",
            "Intake Type",
            "Intake Condition",
            "Animal Type",
            "Sex upon Intake",
            "Age upon Intake",
            "Breed",
            "Color",
        ])
    }

    #[test]
    fn resolves_austin_export_headers() {
        let map = ColumnMap::from_csv_headers(&austin_headers(), ALIASES);
        for field in [
            Field::AnimalId,
            Field::DateTime,
            Field::MonthYear,
            Field::FoundLocation,
            Field::Sex,
        ] {
            assert!(map.contains(field), "missing {field}");
        }
        assert!(!map.contains(Field::OutcomeType));

        let row = StringRecord::from(vec![
            "A786884",
            "*Brock",
            "01/03/2019 04:19:00 PM",
            "January 2019",
            "2501 Magin Meadow Dr in Austin (TX)",
            "Stray",
            "Normal",
            "Dog",
            "Neutered Male",
            "2 years",
            "Beagle Mix",
            "Tricolor",
        ]);
        let rec = map.normalize(&row);
        assert_eq!(rec.get(Field::AnimalId), Some("A786884"));
        assert_eq!(rec.get(Field::Sex), Some("Neutered Male"));
        assert_eq!(rec.missing_required(), None);
    }

    #[test]
    fn earlier_alias_wins() {
        let headers = StringRecord::from(vec!["date", "datetime"]);
        let map = ColumnMap::from_csv_headers(&headers, ALIASES);
        let rec = map.normalize(&StringRecord::from(vec!["2019-01-01", "2020-02-02"]));
        assert_eq!(rec.get(Field::DateTime), Some("2020-02-02"));
    }

    #[test]
    fn matches_headers_case_insensitively() {
        let headers = StringRecord::from(vec![" ANIMAL ID ", "outcome type"]);
        let map = ColumnMap::from_csv_headers(&headers, ALIASES);
        assert!(map.contains(Field::AnimalId));
        assert!(map.contains(Field::OutcomeType));
    }

    #[test]
    fn blank_values_are_absent() {
        let headers = StringRecord::from(vec!["animalId", "name"]);
        let map = ColumnMap::from_csv_headers(&headers, ALIASES);
        let rec = map.normalize(&StringRecord::from(vec!["   ", ""]));
        assert_eq!(rec.get(Field::Name), None);
        assert_eq!(rec.missing_required(), Some(Field::AnimalId));
    }

    #[test]
    fn short_rows_do_not_panic() {
        let map = ColumnMap::from_csv_headers(&austin_headers(), ALIASES);
        let rec = map.normalize(&StringRecord::from(vec!["A1"]));
        assert_eq!(rec.get(Field::AnimalId), Some("A1"));
        assert_eq!(rec.get(Field::Color), None);
    }

    #[test]
    fn normalizes_json_style_rows() {
        let mut row = HashMap::new();
        row.insert("animalId".to_string(), "A9".to_string());
        row.insert("outcomeType".to_string(), "Adoption".to_string());
        row.insert("unrelated".to_string(), "x".to_string());
        let rec = normalize_row(&row, ALIASES);
        assert_eq!(rec.get(Field::AnimalId), Some("A9"));
        assert_eq!(rec.get(Field::OutcomeType), Some("Adoption"));
        assert_eq!(rec.get(Field::Breed), None);
    }
}
