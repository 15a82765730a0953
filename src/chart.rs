use std::collections::BTreeMap;
use std::error::Error;

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;

use crate::record::{Checklist, Record};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 420;

/// Charts the dashboard can render from the filtered record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Bar chart of record counts per onboarding status
    StatusDistribution,

    /// Bar chart of record counts per representative
    OnboardingsByRep,

    /// Line chart of onboardings per day across the filtered span
    OnboardingsOverTime,

    /// Histogram of days from onboarding to delivery confirmation
    DaysToConfirmation,

    /// Pie chart of record counts per client sentiment
    SentimentBreakdown,

    /// Bar chart of completion rates per checklist item
    ChecklistCompletion,
}

impl ChartKind {
    /// Parse the URL path segment naming a chart
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "status" => Some(ChartKind::StatusDistribution),
            "reps" => Some(ChartKind::OnboardingsByRep),
            "timeline" => Some(ChartKind::OnboardingsOverTime),
            "days" => Some(ChartKind::DaysToConfirmation),
            "sentiment" => Some(ChartKind::SentimentBreakdown),
            "checklist" => Some(ChartKind::ChecklistCompletion),
            _ => None,
        }
    }
}

/// Render a chart over the filtered records as a standalone SVG document
///
/// An empty record set renders an explicit "no matching records" placeholder
/// instead of a broken chart.
pub fn render(kind: ChartKind, records: &[Record]) -> Result<String, Box<dyn Error>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        if records.is_empty() {
            draw_placeholder(&root)?;
        } else {
            match kind {
                ChartKind::StatusDistribution => draw_bars(
                    &root,
                    "Onboarding Status Distribution",
                    as_values(label_counts(records, |r| {
                        r.status.as_ref().map(|s| s.label().to_string())
                    })),
                    &BLUE,
                    "Onboardings",
                )?,
                ChartKind::OnboardingsByRep => draw_bars(
                    &root,
                    "Onboardings by Representative",
                    as_values(label_counts(records, |r| {
                        let rep = r.rep_name.trim();
                        (!rep.is_empty()).then(|| rep.to_string())
                    })),
                    &GREEN,
                    "Onboardings",
                )?,
                ChartKind::OnboardingsOverTime => draw_timeline(&root, records)?,
                ChartKind::DaysToConfirmation => draw_histogram(&root, records)?,
                ChartKind::SentimentBreakdown => draw_pie(
                    &root,
                    "Client Sentiment Breakdown",
                    label_counts(records, |r| {
                        r.sentiment.as_ref().map(|s| s.label().to_string())
                    }),
                )?,
                ChartKind::ChecklistCompletion => draw_bars(
                    &root,
                    "Checklist Completion Rates",
                    checklist_rates(records),
                    &RGBColor(230, 126, 34),
                    "% complete",
                )?,
            }
        }
        root.present()?;
    }
    Ok(svg)
}

type SvgArea<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn draw_placeholder(root: &SvgArea<'_>) -> Result<(), Box<dyn Error>> {
    root.draw(&Text::new(
        "No matching records",
        ((WIDTH / 2 - 90) as i32, (HEIGHT / 2) as i32),
        ("sans-serif", 20).into_font(),
    ))?;
    Ok(())
}

/// Count records per label, most frequent first
fn label_counts<F>(records: &[Record], label: F) -> Vec<(String, usize)>
where
    F: Fn(&Record) -> Option<String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        if let Some(key) = label(record) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn as_values(counts: Vec<(String, usize)>) -> Vec<(String, f64)> {
    counts
        .into_iter()
        .map(|(label, n)| (label, n as f64))
        .collect()
}

/// Completion rate per checklist item, over records that answered the item
///
/// Unanswered (null) cells are excluded from the denominator; an item no
/// record answered is omitted from the chart entirely.
fn checklist_rates(records: &[Record]) -> Vec<(String, f64)> {
    Checklist::LABELS
        .iter()
        .enumerate()
        .filter_map(|(index, label)| {
            let mut done = 0usize;
            let mut answered = 0usize;
            for record in records {
                match record.checklist.fields()[index] {
                    Some(true) => {
                        done += 1;
                        answered += 1;
                    }
                    Some(false) => answered += 1,
                    None => {}
                }
            }
            (answered > 0).then(|| (label.to_string(), 100.0 * done as f64 / answered as f64))
        })
        .collect()
}

fn draw_bars(
    root: &SvgArea<'_>,
    title: &str,
    entries: Vec<(String, f64)>,
    color: &RGBColor,
    y_desc: &str,
) -> Result<(), Box<dyn Error>> {
    if entries.is_empty() {
        return draw_placeholder(root);
    }

    let max = entries
        .iter()
        .map(|(_, value)| *value)
        .fold(0.0f64, f64::max)
        .max(1.0);
    let labels: Vec<String> = entries.iter().map(|(label, _)| label.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22).into_font())
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(44)
        .build_cartesian_2d(-0.5f64..entries.len() as f64 - 0.5, 0.0..max * 1.15)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(entries.len())
        .x_label_formatter(&|x: &f64| {
            let index = x.round();
            if (x - index).abs() > 0.01 || index < 0.0 {
                return String::new();
            }
            labels
                .get(index as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(i, (_, value))| {
        Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *value)],
            color.filled(),
        )
    }))?;

    Ok(())
}

fn draw_pie(
    root: &SvgArea<'_>,
    title: &str,
    counts: Vec<(String, usize)>,
) -> Result<(), Box<dyn Error>> {
    if counts.is_empty() {
        return draw_placeholder(root);
    }

    root.draw(&Text::new(
        title,
        ((WIDTH / 2 - 120) as i32, 18),
        ("sans-serif", 22).into_font(),
    ))?;

    let sizes: Vec<f64> = counts.iter().map(|(_, n)| *n as f64).collect();
    let labels: Vec<String> = counts
        .iter()
        .map(|(label, n)| format!("{label} ({n})"))
        .collect();
    let palette = [BLUE, GREEN, RED, MAGENTA, CYAN, YELLOW];
    let colors: Vec<RGBColor> = (0..counts.len())
        .map(|i| palette[i % palette.len()])
        .collect();

    let center = ((WIDTH / 2) as i32, (HEIGHT / 2 + 16) as i32);
    let radius = f64::from(HEIGHT) / 2.0 - 70.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 14).into_font());
    root.draw(&pie)?;

    Ok(())
}

fn draw_timeline(root: &SvgArea<'_>, records: &[Record]) -> Result<(), Box<dyn Error>> {
    let mut by_day: BTreeMap<NaiveDate, i32> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.onboarding_date {
            *by_day.entry(date).or_insert(0) += 1;
        }
    }

    let Some(min) = by_day.keys().next().copied() else {
        return draw_placeholder(root);
    };
    let max = by_day.keys().next_back().copied().unwrap_or(min);
    let axis_end = max.succ_opt().unwrap_or(max);
    let max_count = by_day.values().copied().max().unwrap_or(1);

    let mut chart = ChartBuilder::on(root)
        .caption("Onboardings Over Filtered Period", ("sans-serif", 22).into_font())
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(44)
        .build_cartesian_2d(min..axis_end, 0..max_count + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(6)
        .y_desc("Onboardings")
        .draw()?;

    // Fill calendar gaps with zeros so quiet days show as dips, not
    // interpolated slopes.
    let mut series: Vec<(NaiveDate, i32)> = Vec::new();
    let mut day = min;
    while day <= max {
        series.push((day, by_day.get(&day).copied().unwrap_or(0)));
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    chart.draw_series(LineSeries::new(series, &BLUE))?;

    Ok(())
}

fn draw_histogram(root: &SvgArea<'_>, records: &[Record]) -> Result<(), Box<dyn Error>> {
    let days: Vec<f64> = records
        .iter()
        .filter_map(|r| r.days_to_confirmation())
        .map(|d| d as f64)
        .collect();
    if days.is_empty() {
        return draw_placeholder(root);
    }

    let min = days.iter().copied().fold(f64::INFINITY, f64::min);
    let max = days.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bucket = ((max - min) / 12.0).ceil().max(1.0);

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in &days {
        let key = ((value - min) / bucket).floor() as i64;
        *counts.entry(key).or_insert(0) += 1;
    }
    let buckets = counts.keys().next_back().copied().unwrap_or(0) + 1;
    let max_count = counts.values().copied().max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption("Days to Confirmation Distribution", ("sans-serif", 22).into_font())
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(44)
        .build_cartesian_2d(min..min + bucket * buckets as f64, 0.0..max_count * 1.15)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Days")
        .y_desc("Onboardings")
        .draw()?;

    chart.draw_series(counts.iter().map(|(key, count)| {
        let left = min + *key as f64 * bucket;
        Rectangle::new([(left, 0.0), (left + bucket, *count as f64)], RED.mix(0.6).filled())
    }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Sentiment, Status};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(id: &str, status: &str, onboard: u32, delivery: Option<u32>) -> Record {
        let mut checklist = Checklist::default();
        checklist.intro_self = Some(true);
        checklist.kit_received = Some(false);
        Record {
            license_number: id.to_string(),
            store_name: "Store".to_string(),
            rep_name: "Jordan".to_string(),
            status: Some(Status::from(status.to_string())),
            sentiment: Some(Sentiment::Positive),
            onboarding_date: Some(d(2024, 6, onboard)),
            delivery_date: delivery.map(|day| d(2024, 6, day)),
            score: None,
            checklist,
            summary: String::new(),
            transcript: String::new(),
        }
    }

    #[test]
    fn chart_kind_parses_path_segments() {
        assert_eq!(ChartKind::parse("status"), Some(ChartKind::StatusDistribution));
        assert_eq!(ChartKind::parse("Timeline"), Some(ChartKind::OnboardingsOverTime));
        assert_eq!(ChartKind::parse("sentiment"), Some(ChartKind::SentimentBreakdown));
        assert_eq!(ChartKind::parse("checklist"), Some(ChartKind::ChecklistCompletion));
        assert_eq!(ChartKind::parse("pie"), None);
    }

    #[test]
    fn empty_set_renders_placeholder_text() {
        let svg = render(ChartKind::StatusDistribution, &[]).unwrap();
        assert!(svg.contains("No matching records"));
    }

    #[test]
    fn every_kind_renders_valid_svg() {
        let records = vec![
            record("A1", "Confirmed", 1, Some(3)),
            record("A2", "Failed", 2, None),
            record("A3", "Confirmed", 5, Some(9)),
        ];
        for kind in [
            ChartKind::StatusDistribution,
            ChartKind::OnboardingsByRep,
            ChartKind::OnboardingsOverTime,
            ChartKind::DaysToConfirmation,
            ChartKind::SentimentBreakdown,
            ChartKind::ChecklistCompletion,
        ] {
            let svg = render(kind, &records).unwrap();
            assert!(svg.contains("<svg"), "missing svg root for {kind:?}");
        }
    }

    #[test]
    fn label_counts_order_by_frequency() {
        let records = vec![
            record("A1", "Confirmed", 1, None),
            record("A2", "Confirmed", 2, None),
            record("A3", "Failed", 3, None),
        ];
        let counts = label_counts(&records, |r| {
            r.status.as_ref().map(|s| s.label().to_string())
        });
        assert_eq!(counts[0], ("Confirmed".to_string(), 2));
        assert_eq!(counts[1], ("Failed".to_string(), 1));
    }

    #[test]
    fn checklist_rates_exclude_unanswered_cells() {
        let mut first = record("A1", "Confirmed", 1, None);
        first.checklist.intro_self = Some(true);
        first.checklist.kit_received = Some(true);
        let mut second = record("A2", "Confirmed", 2, None);
        second.checklist.intro_self = Some(false);
        second.checklist.kit_received = None;

        let rates = checklist_rates(&[first, second]);
        // The fixtures answer only the first two items; the rest are omitted.
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0], (Checklist::LABELS[0].to_string(), 50.0));
        assert_eq!(rates[1], (Checklist::LABELS[1].to_string(), 100.0));
    }

    #[test]
    fn sentiment_pie_labels_carry_counts() {
        let records = vec![
            record("A1", "Confirmed", 1, None),
            record("A2", "Confirmed", 2, None),
        ];
        let svg = render(ChartKind::SentimentBreakdown, &records).unwrap();
        assert!(svg.contains("Positive (2)"));
    }
}
