use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{FilterSpec, Record};

/// Apply a filter spec to the full record set
///
/// A non-empty free-text search takes precedence and overrides every other
/// predicate; otherwise all non-empty fields are ANDed. The result is a new
/// sequence (input untouched), ordered by delivery date ascending with
/// null-delivery records last; ties keep their original relative order.
pub fn apply(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    let mut matched: Vec<Record> = match search_term(spec) {
        Some(term) => records
            .iter()
            .filter(|r| matches_search(r, &term))
            .cloned()
            .collect(),
        None => records
            .iter()
            .filter(|r| matches_predicates(r, spec))
            .cloned()
            .collect(),
    };

    matched.sort_by(|a, b| match (a.delivery_date, b.delivery_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    matched
}

fn search_term(spec: &FilterSpec) -> Option<String> {
    spec.search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring match over license number and store name
fn matches_search(record: &Record, lowered_term: &str) -> bool {
    record
        .license_number
        .to_lowercase()
        .contains(lowered_term)
        || record.store_name.to_lowercase().contains(lowered_term)
}

fn matches_predicates(record: &Record, spec: &FilterSpec) -> bool {
    let in_range = record
        .onboarding_date
        .is_some_and(|d| d >= spec.start && d <= spec.end);
    if !in_range {
        return false;
    }

    if let Some(rep) = nonempty(&spec.rep) {
        if !record.rep_name.eq_ignore_ascii_case(rep.trim()) {
            return false;
        }
    }
    if let Some(status) = nonempty(&spec.status) {
        if !record.status.as_ref().is_some_and(|s| s.matches(status)) {
            return false;
        }
    }
    if let Some(sentiment) = nonempty(&spec.sentiment) {
        if !record
            .sentiment
            .as_ref()
            .is_some_and(|s| s.matches(sentiment))
        {
            return false;
        }
    }
    true
}

fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Distinct values offered by the filter dropdowns, plus the data date extent
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub reps: Vec<String>,
    pub statuses: Vec<String>,
    pub sentiments: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

/// Collect sorted distinct filter options from the loaded records
pub fn distinct_options(records: &[Record]) -> FilterOptions {
    let mut reps = BTreeSet::new();
    let mut statuses = BTreeSet::new();
    let mut sentiments = BTreeSet::new();
    let mut min_date: Option<NaiveDate> = None;
    let mut max_date: Option<NaiveDate> = None;

    for record in records {
        if !record.rep_name.trim().is_empty() {
            reps.insert(record.rep_name.trim().to_string());
        }
        if let Some(status) = &record.status {
            statuses.insert(status.label().to_string());
        }
        if let Some(sentiment) = &record.sentiment {
            sentiments.insert(sentiment.label().to_string());
        }
        if let Some(date) = record.onboarding_date {
            min_date = Some(min_date.map_or(date, |m| m.min(date)));
            max_date = Some(max_date.map_or(date, |m| m.max(date)));
        }
    }

    FilterOptions {
        reps: reps.into_iter().collect(),
        statuses: statuses.into_iter().collect(),
        sentiments: sentiments.into_iter().collect(),
        min_date,
        max_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Checklist, Sentiment, Status};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(
        id: &str,
        store: &str,
        rep: &str,
        status: &str,
        onboard: NaiveDate,
        delivery: Option<NaiveDate>,
    ) -> Record {
        Record {
            license_number: id.to_string(),
            store_name: store.to_string(),
            rep_name: rep.to_string(),
            status: Some(Status::from(status.to_string())),
            sentiment: Some(Sentiment::Positive),
            onboarding_date: Some(onboard),
            delivery_date: delivery,
            score: None,
            checklist: Checklist::default(),
            summary: String::new(),
            transcript: String::new(),
        }
    }

    fn june_spec() -> FilterSpec {
        FilterSpec::month_to_date(d(2024, 6, 30))
    }

    fn sample() -> Vec<Record> {
        vec![
            record("A1", "Harbor", "Jordan", "Success", d(2024, 6, 1), Some(d(2024, 6, 3))),
            record("A2", "Green Leaf", "Sam", "Failed", d(2024, 6, 2), None),
            record("A3", "Summit", "Jordan", "Confirmed", d(2024, 6, 5), Some(d(2024, 6, 2))),
            record("B7", "Coastal", "Riley", "Confirmed", d(2024, 5, 10), Some(d(2024, 5, 12))),
        ]
    }

    #[test]
    fn output_is_a_subset_sorted_by_delivery_nulls_last() {
        let records = sample();
        let out = apply(&records, &june_spec());

        assert!(out.iter().all(|r| records.contains(r)));
        let ids: Vec<&str> = out.iter().map(|r| r.license_number.as_str()).collect();
        assert_eq!(ids, vec!["A3", "A1", "A2"]);
    }

    #[test]
    fn date_window_excludes_out_of_range_records() {
        let out = apply(&sample(), &june_spec());
        assert!(out.iter().all(|r| r.license_number != "B7"));
    }

    #[test]
    fn predicates_combine_with_logical_and() {
        let mut spec = june_spec();
        spec.rep = Some("Jordan".to_string());
        spec.status = Some("Confirmed".to_string());
        let out = apply(&sample(), &spec);
        let ids: Vec<&str> = out.iter().map(|r| r.license_number.as_str()).collect();
        assert_eq!(ids, vec!["A3"]);
    }

    #[test]
    fn search_overrides_every_other_filter() {
        let mut spec = june_spec();
        spec.rep = Some("Riley".to_string());
        spec.status = Some("Failed".to_string());
        spec.start = d(2024, 6, 20); // window that matches nothing
        spec.end = d(2024, 6, 21);
        spec.search = Some("A1".to_string());

        let with_other_filters = apply(&sample(), &spec);
        let ids: Vec<&str> = with_other_filters
            .iter()
            .map(|r| r.license_number.as_str())
            .collect();
        assert_eq!(ids, vec!["A1"]);

        // Identical to running the search predicate alone.
        let mut search_only = june_spec();
        search_only.search = Some("A1".to_string());
        assert_eq!(with_other_filters, apply(&sample(), &search_only));
    }

    #[test]
    fn search_matches_store_name_case_insensitively() {
        let mut spec = june_spec();
        spec.search = Some("green".to_string());
        let out = apply(&sample(), &spec);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].license_number, "A2");
    }

    #[test]
    fn blank_search_does_not_override() {
        let mut spec = june_spec();
        spec.search = Some("   ".to_string());
        spec.rep = Some("Jordan".to_string());
        let out = apply(&sample(), &spec);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn distinct_options_are_sorted_and_deduplicated() {
        let options = distinct_options(&sample());
        assert_eq!(options.reps, vec!["Jordan", "Riley", "Sam"]);
        assert_eq!(options.statuses, vec!["Confirmed", "Failed", "Success"]);
        assert_eq!(options.sentiments, vec!["Positive"]);
        assert_eq!(options.min_date, Some(d(2024, 5, 10)));
        assert_eq!(options.max_date, Some(d(2024, 6, 5)));
    }
}
