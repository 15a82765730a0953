use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Onboarding status reported by the sheet
///
/// The set of values actually seen in production is small and fixed, but the
/// sheet is hand-maintained, so anything unrecognized is carried through as
/// `Other` rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Confirmed,
    Pending,
    Failed,
    Other(String),
}

impl Status {
    /// Canonical display label for this status
    pub fn label(&self) -> &str {
        match self {
            Status::Confirmed => "Confirmed",
            Status::Pending => "Pending",
            Status::Failed => "Failed",
            Status::Other(s) => s,
        }
    }

    /// Case-insensitive comparison against a user- or config-supplied label
    pub fn matches(&self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "confirmed" => Status::Confirmed,
            "pending" => Status::Pending,
            "failed" => Status::Failed,
            _ => Status::Other(raw.trim().to_string()),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.label().to_string()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Client sentiment recorded on the onboarding call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Other(String),
}

impl Sentiment {
    pub fn label(&self) -> &str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
            Sentiment::Other(s) => s,
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

impl From<String> for Sentiment {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Other(raw.trim().to_string()),
        }
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.label().to_string()
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Onboarding call checklist
///
/// Each field is tri-state: the rep either completed the item (`Some(true)`),
/// explicitly did not (`Some(false)`), or the sheet cell was blank or
/// unrecognized (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    /// Rep introduced themselves and the company
    pub intro_self: Option<bool>,

    /// Client confirmed receipt of the onboarding kit and initial order
    pub kit_received: Option<bool>,

    /// Rep offered help with the in-store display setup
    pub display_help: Option<bool>,

    /// Budtender training and first promo event were scheduled
    pub training_scheduled: Option<bool>,

    /// Promo-credit reimbursement link was provided
    pub promo_link: Option<bool>,

    /// Client expectations were clearly set
    pub expectations_set: Option<bool>,
}

impl Checklist {
    /// Export/display labels, in checklist order
    pub const LABELS: [&'static str; 6] = [
        "Intro Self & Company",
        "Kit & Order Received",
        "Offer Display Help",
        "Schedule Training & Promo",
        "Provide Promo Link",
        "Expectations Set",
    ];

    /// Field values in the same order as [`Checklist::LABELS`]
    pub fn fields(&self) -> [Option<bool>; 6] {
        [
            self.intro_self,
            self.kit_received,
            self.display_help,
            self.training_scheduled,
            self.promo_link,
            self.expectations_set,
        ]
    }

    /// Set a field by its position in checklist order
    pub fn set(&mut self, index: usize, value: Option<bool>) {
        match index {
            0 => self.intro_self = value,
            1 => self.kit_received = value,
            2 => self.display_help = value,
            3 => self.training_scheduled = value,
            4 => self.promo_link = value,
            _ => self.expectations_set = value,
        }
    }
}

/// One normalized onboarding event
///
/// Produced by the schema normalizer from a raw sheet row. All optional
/// fields use `None` as the "missing or unparseable" sentinel; `None` is
/// never conflated with zero or an empty string by downstream computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// License number, the unique key within one load
    pub license_number: String,

    /// Store (client) name
    pub store_name: String,

    /// Representative who ran the onboarding
    pub rep_name: String,

    /// Onboarding status, if the sheet carried one
    pub status: Option<Status>,

    /// Client sentiment, if recorded
    pub sentiment: Option<Sentiment>,

    /// Date the onboarding call happened
    pub onboarding_date: Option<NaiveDate>,

    /// Date delivery was confirmed
    pub delivery_date: Option<NaiveDate>,

    /// Rep score, within `[0, score_max]` or absent
    pub score: Option<f64>,

    /// Call checklist outcomes
    pub checklist: Checklist,

    /// Free-text call summary
    pub summary: String,

    /// Full call transcript, empty when the sheet carries none
    pub transcript: String,
}

impl Record {
    /// Days from onboarding to delivery confirmation
    ///
    /// Defined only when both dates are present.
    pub fn days_to_confirmation(&self) -> Option<i64> {
        match (self.onboarding_date, self.delivery_date) {
            (Some(onboard), Some(delivery)) => Some((delivery - onboard).num_days()),
            _ => None,
        }
    }
}

/// Derived KPI set over some window of records
///
/// Recomputed on every pass, never mutated in place. `None` means "not
/// computable" (empty window or no valid inputs), which is distinct from a
/// legitimate zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSet {
    /// Number of records in the window
    pub total: usize,

    /// Fraction of records whose status is configured as successful, in [0, 1]
    pub success_rate: Option<f64>,

    /// Mean rep score over records with a score
    pub avg_score: Option<f64>,

    /// Mean days-to-confirmation over records with both dates
    pub avg_days_to_confirmation: Option<f64>,
}

impl MetricSet {
    /// The metric set for an empty window: zero total, sentinels everywhere
    pub fn empty() -> Self {
        MetricSet {
            total: 0,
            success_rate: None,
            avg_score: None,
            avg_days_to_confirmation: None,
        }
    }
}

/// User-selected filter state for one recomputation pass
///
/// Built once per interaction and consumed immediately by the filter engine;
/// replaced wholesale on every change, never mutated in place or persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Inclusive start of the onboarding-date window
    pub start: NaiveDate,

    /// Inclusive end of the onboarding-date window
    pub end: NaiveDate,

    /// Exact rep name, if filtering by rep
    pub rep: Option<String>,

    /// Exact status label, if filtering by status
    pub status: Option<String>,

    /// Exact sentiment label, if filtering by sentiment
    pub sentiment: Option<String>,

    /// Free-text search over license number and store name; when non-empty
    /// it overrides every other predicate
    pub search: Option<String>,
}

impl FilterSpec {
    /// Default filter at session start: the month-to-date window, nothing else
    pub fn month_to_date(reference: NaiveDate) -> Self {
        FilterSpec {
            start: first_of_month(reference),
            end: reference,
            rep: None,
            status: None,
            sentiment: None,
            search: None,
        }
    }
}

/// Named date-range shortcuts offered next to the custom range picker
///
/// A shortcut is resolved to concrete bounds once, when selected. The bounds
/// are not re-evaluated as wall-clock time advances within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShortcut {
    MonthToDate,
    YearToDate,
    AllTime,
}

impl DateShortcut {
    /// Parse the query-string form of a shortcut
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "mtd" => Some(DateShortcut::MonthToDate),
            "ytd" => Some(DateShortcut::YearToDate),
            "all" => Some(DateShortcut::AllTime),
            _ => None,
        }
    }

    /// Resolve the shortcut to inclusive bounds
    ///
    /// `extent` is the (min, max) onboarding date present in the loaded data;
    /// `AllTime` falls back to year-to-date when no extent is known.
    pub fn resolve(
        self,
        reference: NaiveDate,
        extent: Option<(NaiveDate, NaiveDate)>,
    ) -> (NaiveDate, NaiveDate) {
        match self {
            DateShortcut::MonthToDate => (first_of_month(reference), reference),
            DateShortcut::YearToDate => (first_of_year(reference), reference),
            DateShortcut::AllTime => match extent {
                Some((min, max)) => (min, max),
                None => (first_of_year(reference), reference),
            },
        }
    }
}

/// First day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// January 1st of the year containing `date`
pub fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}
