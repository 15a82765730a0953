use chrono::NaiveDate;

use crate::record::{first_of_month, MetricSet, Record};

/// Compute the KPI set over an already-windowed record sequence
///
/// Success rate counts records whose status matches any configured success
/// label. Averages exclude null inputs rather than treating them as zero;
/// when no valid inputs exist the metric is the `None` sentinel. An empty
/// window yields [`MetricSet::empty`] and never a division error.
pub fn compute<'a, I>(records: I, success_statuses: &[String]) -> MetricSet
where
    I: IntoIterator<Item = &'a Record>,
{
    let records: Vec<&Record> = records.into_iter().collect();
    let total = records.len();
    if total == 0 {
        return MetricSet::empty();
    }

    let successes = records
        .iter()
        .filter(|r| {
            r.status
                .as_ref()
                .is_some_and(|s| success_statuses.iter().any(|label| s.matches(label)))
        })
        .count();

    MetricSet {
        total,
        success_rate: Some(successes as f64 / total as f64),
        avg_score: mean(records.iter().filter_map(|r| r.score)),
        avg_days_to_confirmation: mean(
            records
                .iter()
                .filter_map(|r| r.days_to_confirmation().map(|d| d as f64)),
        ),
    }
}

/// Records whose onboarding date falls inside the inclusive window
///
/// Records with no onboarding date never match a window.
pub fn in_window<'a>(
    records: &'a [Record],
    start: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = &'a Record> {
    records
        .iter()
        .filter(move |r| r.onboarding_date.is_some_and(|d| d >= start && d <= end))
}

/// Month-to-date KPIs: `[first-of-month(reference), reference]`
pub fn month_to_date(
    records: &[Record],
    reference: NaiveDate,
    success_statuses: &[String],
) -> MetricSet {
    compute(
        in_window(records, first_of_month(reference), reference),
        success_statuses,
    )
}

/// KPIs over the full calendar month before the reference month
///
/// Reuses the same computation with a shifted window, for trend comparison
/// against the current month-to-date numbers.
pub fn prior_month(
    records: &[Record],
    reference: NaiveDate,
    success_statuses: &[String],
) -> MetricSet {
    let Some(end) = first_of_month(reference).pred_opt() else {
        return MetricSet::empty();
    };
    compute(
        in_window(records, first_of_month(end), end),
        success_statuses,
    )
}

/// Change in onboarding volume versus the prior month
pub fn trend_delta(current: &MetricSet, prior: &MetricSet) -> i64 {
    current.total as i64 - prior.total as i64
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
