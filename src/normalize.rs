use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::Config;
use crate::record::{Checklist, Record, Sentiment, Status};
use crate::source::RowGrid;

/// Date formats accepted from sheet cells, tried in order
///
/// The sheet is filled in by hand from several tools, so both ISO and US
/// slash dates show up, with and without a time component.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Canonical sheet columns the normalizer knows how to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    License,
    Store,
    Rep,
    Status,
    Sentiment,
    OnboardingDate,
    DeliveryDate,
    Score,
    Summary,
    Transcript,
    Checklist(usize),
}

/// Result of one normalization pass
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Typed records, in sheet order
    pub records: Vec<Record>,

    /// Rows dropped for a missing or duplicate identifier
    pub skipped: usize,
}

/// Coerces raw string cells into typed record fields
///
/// Per-cell failures become `None` on the record; only a missing or
/// duplicate identifier drops the whole row. The pass is a pure
/// transformation with no side effects.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Upper bound of the rep score; values outside `[0, score_max]` become null
    pub score_max: f64,

    /// Recognized truthy cell values (compared lowercased)
    pub truthy: Vec<String>,

    /// Recognized falsy cell values (compared lowercased)
    pub falsy: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer {
            score_max: 10.0,
            truthy: vec!["true".to_string(), "yes".to_string(), "1".to_string()],
            falsy: vec!["false".to_string(), "no".to_string(), "0".to_string()],
        }
    }
}

impl Normalizer {
    /// Build a normalizer from the startup configuration
    pub fn from_config(config: &Config) -> Self {
        Normalizer {
            score_max: config.score_max,
            truthy: config.truthy_values.clone(),
            falsy: config.falsy_values.clone(),
        }
    }

    /// Normalize a fetched grid into typed records plus a skipped-row count
    pub fn normalize(&self, grid: &RowGrid) -> Normalized {
        let columns: Vec<Option<Field>> = grid
            .headers
            .iter()
            .map(|h| field_for(&canonical_header(h)))
            .collect();

        let mut records = Vec::with_capacity(grid.rows.len());
        let mut skipped = 0usize;
        let mut seen: HashSet<String> = HashSet::new();

        for row in &grid.rows {
            let mut record = Record {
                license_number: String::new(),
                store_name: String::new(),
                rep_name: String::new(),
                status: None,
                sentiment: None,
                onboarding_date: None,
                delivery_date: None,
                score: None,
                checklist: Checklist::default(),
                summary: String::new(),
                transcript: String::new(),
            };

            for (cell, field) in row.iter().zip(columns.iter()) {
                let value = cell.replace('\n', " ");
                let value = value.trim();
                let Some(field) = field else { continue };
                match field {
                    Field::License => record.license_number = value.to_string(),
                    Field::Store => record.store_name = value.to_string(),
                    Field::Rep => record.rep_name = value.to_string(),
                    Field::Status => {
                        if !value.is_empty() {
                            record.status = Some(Status::from(value.to_string()));
                        }
                    }
                    Field::Sentiment => {
                        if !value.is_empty() {
                            record.sentiment = Some(Sentiment::from(value.to_string()));
                        }
                    }
                    Field::OnboardingDate => record.onboarding_date = parse_date(value),
                    Field::DeliveryDate => record.delivery_date = parse_date(value),
                    Field::Score => record.score = self.parse_score(value),
                    Field::Summary => record.summary = value.to_string(),
                    Field::Transcript => record.transcript = value.to_string(),
                    Field::Checklist(index) => {
                        record.checklist.set(*index, self.parse_bool(value));
                    }
                }
            }

            if record.license_number.is_empty() || !seen.insert(record.license_number.clone()) {
                skipped += 1;
                continue;
            }
            records.push(record);
        }

        Normalized { records, skipped }
    }

    /// Map recognized truthy/falsy forms to a boolean; anything else is null
    fn parse_bool(&self, raw: &str) -> Option<bool> {
        let lowered = raw.to_lowercase();
        if self.truthy.iter().any(|t| *t == lowered) {
            Some(true)
        } else if self.falsy.iter().any(|f| *f == lowered) {
            Some(false)
        } else {
            None
        }
    }

    /// Parse a score, rejecting out-of-range and non-numeric values
    fn parse_score(&self, raw: &str) -> Option<f64> {
        let score: f64 = raw.parse().ok()?;
        if (0.0..=self.score_max).contains(&score) {
            Some(score)
        } else {
            None
        }
    }
}

/// Parse a sheet date cell against the accepted formats
///
/// Unparseable and empty cells become `None`; they never fail the row.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Standardize a header cell: trim, lowercase, strip internal whitespace
fn canonical_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<String>()
}

/// Map a standardized header to its canonical field, if recognized
///
/// Aliases cover the column spellings seen across sheet revisions.
fn field_for(header: &str) -> Option<Field> {
    match header {
        "licensenumber" | "dcclicense" => Some(Field::License),
        "storename" => Some(Field::Store),
        "repname" => Some(Field::Rep),
        "status" => Some(Field::Status),
        "clientsentiment" | "sentiment" => Some(Field::Sentiment),
        "onboardingdate" => Some(Field::OnboardingDate),
        "deliverydate" | "confirmationdate" | "confirmationtimestamp" => {
            Some(Field::DeliveryDate)
        }
        "score" => Some(Field::Score),
        "summary" => Some(Field::Summary),
        "fulltranscript" | "transcript" => Some(Field::Transcript),
        "introselfanddime" | "introself" => Some(Field::Checklist(0)),
        "confirmkitreceived" => Some(Field::Checklist(1)),
        "offerdisplayhelp" => Some(Field::Checklist(2)),
        "scheduletrainingandpromo" => Some(Field::Checklist(3)),
        "providepromocreditlink" => Some(Field::Checklist(4)),
        "expectationsset" => Some(Field::Checklist(5)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(headers: &[&str], rows: &[&[&str]]) -> RowGrid {
        RowGrid {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn parses_iso_and_slash_dates() {
        assert_eq!(
            parse_date("2024-06-01"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(
            parse_date("06/15/2024"),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(
            parse_date("25/12/2024"),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
        assert_eq!(
            parse_date("2024-06-01 14:30:00"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }

    #[test]
    fn invalid_date_is_null_but_row_survives() {
        let g = grid(
            &["licenseNumber", "onboardingDate"],
            &[&["C-1", "not a date"]],
        );
        let out = Normalizer::default().normalize(&g);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.skipped, 0);
        assert_eq!(out.records[0].onboarding_date, None);
    }

    #[test]
    fn recognized_boolean_forms_map_unrecognized_to_null() {
        let n = Normalizer::default();
        assert_eq!(n.parse_bool("TRUE"), Some(true));
        assert_eq!(n.parse_bool("Yes"), Some(true));
        assert_eq!(n.parse_bool("1"), Some(true));
        assert_eq!(n.parse_bool("no"), Some(false));
        assert_eq!(n.parse_bool("maybe"), None);
        assert_eq!(n.parse_bool(""), None);
    }

    #[test]
    fn out_of_range_scores_become_null() {
        let n = Normalizer::default();
        assert_eq!(n.parse_score("7.5"), Some(7.5));
        assert_eq!(n.parse_score("11"), None);
        assert_eq!(n.parse_score("-1"), None);
        assert_eq!(n.parse_score("high"), None);
    }

    #[test]
    fn missing_and_duplicate_identifiers_are_skipped() {
        let g = grid(
            &["licenseNumber", "storeName"],
            &[
                &["C-1", "First"],
                &["", "No License"],
                &["C-1", "Duplicate"],
                &["C-2", "Second"],
            ],
        );
        let out = Normalizer::default().normalize(&g);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.skipped, 2);
        assert_eq!(out.records[0].store_name, "First");
        assert_eq!(out.records[1].license_number, "C-2");
    }

    #[test]
    fn header_aliases_and_case_are_standardized() {
        let g = grid(
            &["dccLicense", "Store Name", "Client Sentiment", "STATUS"],
            &[&["C-9", "Harbor", "Positive", "confirmed"]],
        );
        let out = Normalizer::default().normalize(&g);
        let record = &out.records[0];
        assert_eq!(record.license_number, "C-9");
        assert_eq!(record.store_name, "Harbor");
        assert_eq!(record.sentiment, Some(Sentiment::Positive));
        assert_eq!(record.status, Some(Status::Confirmed));
    }

    #[test]
    fn checklist_cells_fill_in_order() {
        let g = grid(
            &["licenseNumber", "confirmKitReceived", "expectationsSet"],
            &[&["C-1", "TRUE", "no"]],
        );
        let out = Normalizer::default().normalize(&g);
        let checklist = &out.records[0].checklist;
        assert_eq!(checklist.kit_received, Some(true));
        assert_eq!(checklist.expectations_set, Some(false));
        assert_eq!(checklist.intro_self, None);
    }

    #[test]
    fn transcript_column_fills_the_transcript_field() {
        let g = grid(
            &["licenseNumber", "fullTranscript", "summary"],
            &[&["C-1", "Rep: hello. Client: hi.", "Smooth call"]],
        );
        let out = Normalizer::default().normalize(&g);
        let record = &out.records[0];
        assert_eq!(record.transcript, "Rep: hello. Client: hi.");
        assert_eq!(record.summary, "Smooth call");
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let g = grid(
            &["licenseNumber", "internalNotes"],
            &[&["C-1", "ignore me"]],
        );
        let out = Normalizer::default().normalize(&g);
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].summary.is_empty());
    }

    #[test]
    fn input_order_is_preserved() {
        let g = grid(
            &["licenseNumber"],
            &[&["C-3"], &["C-1"], &["C-2"]],
        );
        let out = Normalizer::default().normalize(&g);
        let ids: Vec<&str> = out
            .records
            .iter()
            .map(|r| r.license_number.as_str())
            .collect();
        assert_eq!(ids, vec!["C-3", "C-1", "C-2"]);
    }
}
