//! Generic analytics cards
//!
//! One card renders a list of heterogeneous JSON records in one of ten
//! layouts. Callers that still speak the numeric layout tags go through
//! [`CardSpec::from_legacy`]; everything else builds a [`CardSpec`] directly
//! and gets an exhaustive match instead of a fallback branch.
//!
//! Field lookups are dynamic: a record without the selected field renders a
//! blank cell rather than failing.

use serde::Deserialize;
use serde_json::Value;

use crate::render::{Markup, escape, field_number, field_text, format_float};

/// Maximum rows a metric card shows
pub const METRIC_ROW_LIMIT: usize = 10;

/// Loose per-card parameters used with numeric layout tags
///
/// Names follow the card props of the old dashboard: `*_value` and
/// `key_value` select record fields, `*_text` are literal labels, except
/// where a layout documents otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyCardParams {
    pub key_value: Option<String>,
    pub value: Option<String>,
    pub value_text: Option<String>,
    pub type_value: Option<String>,
    pub type_text: Option<String>,
    pub second_text: Option<String>,
    pub second_value: Option<String>,
    pub tag_text: Option<String>,
    pub tag_value: Option<String>,
}

impl LegacyCardParams {
    /// Label field and value field
    #[must_use]
    pub fn fields(key_value: &str, value: &str) -> Self {
        Self {
            key_value: Some(key_value.to_string()),
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    /// Set `typeText`
    #[must_use]
    pub fn type_text(mut self, text: &str) -> Self {
        self.type_text = Some(text.to_string());
        self
    }

    /// Set `valueText`
    #[must_use]
    pub fn value_text(mut self, text: &str) -> Self {
        self.value_text = Some(text.to_string());
        self
    }

    /// Set `typeValue`
    #[must_use]
    pub fn type_value(mut self, field: &str) -> Self {
        self.type_value = Some(field.to_string());
        self
    }

    /// Set `secondText`
    #[must_use]
    pub fn second_text(mut self, text: &str) -> Self {
        self.second_text = Some(text.to_string());
        self
    }

    /// Set `secondValue`
    #[must_use]
    pub fn second_value(mut self, field: &str) -> Self {
        self.second_value = Some(field.to_string());
        self
    }

    /// Set `tagText` and `tagValue`
    #[must_use]
    pub fn tag(mut self, field: &str, suffix: &str) -> Self {
        self.tag_text = Some(field.to_string());
        self.tag_value = Some(suffix.to_string());
        self
    }
}

/// Card layout with the record fields it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardSpec {
    /// Tag 1: `label: value`, or label and value with a suffix
    Stat {
        label: String,
        value: String,
        suffix: Option<String>,
    },
    /// Tag 2: dated score with an attempt count
    Trend {
        label: String,
        score: String,
        attempts: String,
        attempts_text: String,
    },
    /// Tag 3: interaction type and count
    Interaction {
        label: String,
        value: String,
        value_text: String,
    },
    /// Tag 4: host metric, toned for CPU and memory
    Metric {
        label: String,
        value: String,
        /// Record field holding the unit
        unit: String,
    },
    /// Tag 5: endpoint, request count and latency
    ApiUsage {
        label: String,
        value: String,
        value_text: String,
        latency: String,
        latency_text: String,
    },
    /// Tag 6: ranked title and count
    Ranking {
        label: String,
        value: String,
        value_text: String,
    },
    /// Tag 7: enrolled, completed and rate per course
    Completion {
        label: String,
        first_text: String,
        first: String,
        second_text: String,
        second: String,
        rate: String,
        rate_suffix: String,
    },
    /// Tag 8: category with a count
    Distribution {
        label: String,
        label_suffix: String,
        value: String,
        value_text: String,
    },
    /// Tag 9: label, count and a colored percent bar
    Progress {
        label: String,
        value: String,
        value_text: String,
        percent: String,
    },
    /// Tag 10: user with a session count
    TopUsers {
        label: String,
        label_suffix: String,
        value: String,
        value_text: String,
    },
}

/// Derived styling of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    /// Metric under 50
    Good,
    /// Metric between 50 and 85
    Warning,
    /// Metric over 85
    Bad,
    /// Progress over 75 percent
    Success,
    /// Progress over 40 percent
    Info,
    /// Progress at or under 40 percent, or unknown
    Amber,
}

impl Tone {
    /// CSS class added to the toned element
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Bad => "bad",
            Self::Success => "success",
            Self::Info => "info",
            Self::Amber => "amber",
        }
    }

    /// Text color of a progress percent
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Success | Self::Good => "#10b981",
            Self::Info => "#3b82f6",
            Self::Amber | Self::Warning => "#f59e0b",
            Self::Bad => "#ef4444",
        }
    }

    /// Fill of a progress bar
    #[must_use]
    pub const fn gradient(self) -> &'static str {
        match self {
            Self::Success | Self::Good => "linear-gradient(90deg, #10b981, #059669)",
            Self::Info => "linear-gradient(90deg, #3b82f6, #1e40af)",
            Self::Amber | Self::Warning => "linear-gradient(90deg, #f59e0b, #d97706)",
            Self::Bad => "linear-gradient(90deg, #ef4444, #b91c1c)",
        }
    }

    /// Tone of a host metric; `None` unless it is a CPU or memory reading
    #[must_use]
    pub fn for_metric(name: &str, value: Option<f64>) -> Option<Self> {
        let name = name.to_lowercase();
        if !(name.contains("cpu") || name.contains("memory")) {
            return None;
        }
        Some(match value {
            Some(v) if v < 50.0 => Self::Good,
            Some(v) if v > 85.0 => Self::Bad,
            _ => Self::Warning,
        })
    }

    /// Tone of a progress percent; missing percents are amber
    #[must_use]
    pub fn for_progress(percent: Option<f64>) -> Self {
        match percent {
            Some(p) if p > 75.0 => Self::Success,
            Some(p) if p > 40.0 => Self::Info,
            _ => Self::Amber,
        }
    }
}

/// One text cell of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCell {
    /// CSS class of the span, if any
    pub class: Option<&'static str>,
    /// Display text
    pub text: String,
}

impl CardCell {
    fn new(class: &'static str, text: String) -> Self {
        Self {
            class: Some(class),
            text,
        }
    }

    fn plain(text: String) -> Self {
        Self { class: None, text }
    }
}

/// One projected record
///
/// The first cell is the row heading; the layout decides how the rest are
/// wrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRow {
    pub cells: Vec<CardCell>,
    pub tone: Option<Tone>,
    /// Progress percent as read from the record
    pub percent: Option<f64>,
}

impl CardRow {
    fn new(cells: Vec<CardCell>) -> Self {
        Self {
            cells,
            tone: None,
            percent: None,
        }
    }

    /// Text of the cell at `index`, empty when out of range
    #[must_use]
    pub fn text(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", |cell| cell.text.as_str())
    }
}

fn field_or(selected: Option<&String>, default: &str) -> String {
    selected.map_or_else(|| default.to_string(), Clone::clone)
}

fn text_of(selected: Option<&String>) -> String {
    selected.cloned().unwrap_or_default()
}

fn non_empty(selected: Option<&String>) -> Option<String> {
    selected.filter(|text| !text.is_empty()).cloned()
}

impl CardSpec {
    /// Map a numeric layout tag and loose parameters to a layout
    ///
    /// Tags 1 and 2 fill in the field names the old dashboard defaulted to;
    /// tag 4 reads `name` and `value` unless told otherwise. Unknown tags
    /// yield `None`.
    #[must_use]
    pub fn from_legacy(tag: u8, params: &LegacyCardParams) -> Option<Self> {
        let key = params.key_value.as_ref();
        let value = params.value.as_ref();

        let spec = match tag {
            1 => Self::Stat {
                label: field_or(key, "label"),
                value: field_or(value, "value"),
                suffix: non_empty(params.type_text.as_ref()),
            },
            2 => Self::Trend {
                label: field_or(key, "date"),
                score: field_or(value, "avg_score"),
                attempts: field_or(params.type_value.as_ref(), "attempt_count"),
                attempts_text: non_empty(params.type_text.as_ref())
                    .unwrap_or_else(|| "attempts".to_string()),
            },
            3 => Self::Interaction {
                label: text_of(key),
                value: text_of(value),
                value_text: text_of(params.value_text.as_ref()),
            },
            4 => Self::Metric {
                label: field_or(key, "name"),
                value: field_or(value, "value"),
                unit: text_of(params.value_text.as_ref()),
            },
            5 => Self::ApiUsage {
                label: text_of(key),
                value: text_of(value),
                value_text: text_of(params.value_text.as_ref()),
                latency: text_of(params.type_value.as_ref()),
                latency_text: text_of(params.type_text.as_ref()),
            },
            6 => Self::Ranking {
                label: text_of(key),
                value: text_of(value),
                value_text: text_of(params.type_text.as_ref()),
            },
            7 => Self::Completion {
                label: text_of(key),
                first_text: text_of(params.type_text.as_ref()),
                first: text_of(params.type_value.as_ref()),
                second_text: text_of(params.second_text.as_ref()),
                second: text_of(params.second_value.as_ref()),
                rate: text_of(params.tag_text.as_ref()),
                rate_suffix: text_of(params.tag_value.as_ref()),
            },
            8 => Self::Distribution {
                label: text_of(key),
                label_suffix: text_of(params.value_text.as_ref()),
                value: text_of(value),
                value_text: text_of(params.type_text.as_ref()),
            },
            9 => Self::Progress {
                label: text_of(key),
                value: text_of(value),
                value_text: text_of(params.type_text.as_ref()),
                percent: text_of(params.second_value.as_ref()),
            },
            10 => Self::TopUsers {
                label: text_of(key),
                label_suffix: text_of(params.value_text.as_ref()),
                value: text_of(value),
                value_text: text_of(params.type_text.as_ref()),
            },
            _ => return None,
        };
        Some(spec)
    }

    /// Numeric tag of this layout
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Stat { .. } => 1,
            Self::Trend { .. } => 2,
            Self::Interaction { .. } => 3,
            Self::Metric { .. } => 4,
            Self::ApiUsage { .. } => 5,
            Self::Ranking { .. } => 6,
            Self::Completion { .. } => 7,
            Self::Distribution { .. } => 8,
            Self::Progress { .. } => 9,
            Self::TopUsers { .. } => 10,
        }
    }

    /// Title that replaces the caller's, for layouts with a fixed heading
    #[must_use]
    pub const fn fixed_title(&self) -> Option<&'static str> {
        match self {
            Self::Metric { .. } => Some("System Metrics"),
            Self::ApiUsage { .. } => Some("API Usage Statistics"),
            _ => None,
        }
    }

    /// Container class and per-row class
    const fn classes(&self) -> (&'static str, &'static str) {
        match self {
            Self::Stat { .. } => ("activity-stats top-learners", "card learner-item"),
            Self::Trend { .. } => ("quiz-trends", "card quiz-trend-item"),
            Self::Interaction { .. } => ("content-interactions", "card interaction-item"),
            Self::Metric { .. } => ("system-metrics", "metric-card"),
            Self::ApiUsage { .. } => ("api-usage", "api-item"),
            Self::Ranking { .. } => ("popular-courses", "course-item"),
            Self::Completion { .. } => ("completion-rates", "completion-item"),
            Self::Distribution { .. } => ("role-stats", "role-item"),
            Self::Progress { .. } => ("progress-list", "progress-row"),
            Self::TopUsers { .. } => ("top-users", "user-item"),
        }
    }

    /// Project records into display rows
    #[must_use]
    pub fn project(&self, records: &[Value]) -> Vec<CardRow> {
        let limit = match self {
            Self::Metric { .. } => METRIC_ROW_LIMIT,
            _ => records.len(),
        };
        records
            .iter()
            .take(limit)
            .map(|record| self.project_one(record))
            .collect()
    }

    fn project_one(&self, r: &Value) -> CardRow {
        match self {
            Self::Stat {
                label,
                value,
                suffix: Some(suffix),
            } => CardRow::new(vec![
                CardCell::new("username", field_text(r, label)),
                CardCell::new("progress", format!("{}{suffix}", field_text(r, value))),
            ]),
            Self::Stat {
                label,
                value,
                suffix: None,
            } => CardRow::new(vec![CardCell::plain(format!(
                "{}: {}",
                field_text(r, label),
                field_text(r, value)
            ))]),
            Self::Trend {
                label,
                score,
                attempts,
                attempts_text,
            } => CardRow::new(vec![
                CardCell::new("card-header", field_text(r, label)),
                CardCell::new("score", format!("{}%", field_text(r, score))),
                CardCell::new(
                    "attempts",
                    format!("{} {attempts_text}", field_text(r, attempts)),
                ),
            ]),
            Self::Interaction {
                label,
                value,
                value_text,
            } => CardRow::new(vec![
                CardCell::new("type", field_text(r, label)),
                CardCell::new("count", format!("{} {value_text}", field_text(r, value))),
            ]),
            Self::Metric { label, value, unit } => {
                let name = field_text(r, label);
                let tone = Tone::for_metric(&name, field_number(r, value));
                let mut row = CardRow::new(vec![
                    CardCell::new("metric-header", name),
                    CardCell::new(
                        "metric-value",
                        format!("{} {}", field_text(r, value), field_text(r, unit)),
                    ),
                ]);
                row.tone = tone;
                row
            }
            Self::ApiUsage {
                label,
                value,
                value_text,
                latency,
                latency_text,
            } => CardRow::new(vec![
                CardCell::new("endpoint", field_text(r, label)),
                CardCell::new("requests", format!("{} {value_text}", field_text(r, value))),
                CardCell::new(
                    "response-time",
                    format!("{}{latency_text}", field_text(r, latency)),
                ),
            ]),
            Self::Ranking {
                label,
                value,
                value_text,
            } => CardRow::new(vec![
                CardCell::new("course-title", field_text(r, label)),
                CardCell::new(
                    "enrollment-count",
                    format!("{} {value_text}", field_text(r, value)),
                ),
            ]),
            Self::Completion {
                label,
                first_text,
                first,
                second_text,
                second,
                rate,
                rate_suffix,
            } => CardRow::new(vec![
                CardCell::new("course-name", field_text(r, label)),
                CardCell::plain(format!("{first_text}{}", field_text(r, first))),
                CardCell::plain(format!("{second_text} {}", field_text(r, second))),
                CardCell::new("rate", format!("{}{rate_suffix}", field_text(r, rate))),
            ]),
            Self::Distribution {
                label,
                label_suffix,
                value,
                value_text,
            } => CardRow::new(vec![
                CardCell::new("role-name", format!("{}{label_suffix}", field_text(r, label))),
                CardCell::new("role-count", format!("{} {value_text}", field_text(r, value))),
            ]),
            Self::Progress {
                label,
                value,
                value_text,
                percent,
            } => {
                let pct = field_number(r, percent);
                let shown = pct.map_or_else(|| "50".to_string(), |p| format!("{p:.1}"));
                let mut row = CardRow::new(vec![
                    CardCell::new("progress-label", field_text(r, label)),
                    CardCell::plain(format!("{} {value_text}", field_text(r, value))),
                    CardCell::new("progress-percent", format!("{shown}%")),
                ]);
                row.tone = Some(Tone::for_progress(pct));
                row.percent = pct;
                row
            }
            Self::TopUsers {
                label,
                label_suffix,
                value,
                value_text,
            } => CardRow::new(vec![
                CardCell::new("username", format!("{}{label_suffix}", field_text(r, label))),
                CardCell::new("sessions", format!("{} {value_text}", field_text(r, value))),
            ]),
        }
    }
}

fn span(cell: &CardCell) -> String {
    match cell.class {
        Some(class) => format!("<span class=\"{class}\">{}</span>", escape(&cell.text)),
        None => format!("<span>{}</span>", escape(&cell.text)),
    }
}

fn div(cell: &CardCell, extra_class: Option<&str>) -> String {
    let class = match (cell.class, extra_class) {
        (Some(class), Some(extra)) => format!("{class} {extra}"),
        (Some(class), None) => class.to_string(),
        (None, Some(extra)) => extra.to_string(),
        (None, None) => String::new(),
    };
    format!("<div class=\"{class}\">{}</div>", escape(&cell.text))
}

fn render_row(spec: &CardSpec, row: &CardRow, item_class: &str) -> String {
    let inner: String = match spec {
        CardSpec::Trend { .. } => {
            let body: String = row.cells.iter().skip(1).map(span).collect();
            format!(
                "<div class=\"card-header\">{}</div><div class=\"card-body\">{body}</div>",
                escape(row.text(0))
            )
        }
        CardSpec::Metric { .. } => {
            let header = row.cells.first().map(|c| div(c, None)).unwrap_or_default();
            let value = row
                .cells
                .get(1)
                .map(|c| div(c, row.tone.map(Tone::css_class)))
                .unwrap_or_default();
            format!("{header}{value}")
        }
        CardSpec::Completion { .. } => {
            let stats: String = row.cells.iter().skip(1).map(span).collect();
            format!(
                "<div class=\"course-name\">{}</div><div class=\"completion-stats\">{stats}</div>",
                escape(row.text(0))
            )
        }
        CardSpec::Progress { .. } => {
            let tone = row.tone.unwrap_or(Tone::Amber);
            let width = row.percent.map_or_else(|| "0".to_string(), format_float);
            format!(
                "<div class=\"progress-head\"><div class=\"progress-label\">{}</div>\
                 <div class=\"progress-meta\"><span>{}</span>\
                 <span class=\"progress-percent {}\" style=\"color: {}\">{}</span></div></div>\
                 <div class=\"progress-track\"><div class=\"progress-fill\" \
                 style=\"width: {width}%; background: {}\"></div></div>",
                escape(row.text(0)),
                escape(row.text(1)),
                tone.css_class(),
                tone.color(),
                escape(row.text(2)),
                tone.gradient(),
            )
        }
        CardSpec::Stat { .. }
        | CardSpec::Interaction { .. }
        | CardSpec::ApiUsage { .. }
        | CardSpec::Ranking { .. }
        | CardSpec::Distribution { .. }
        | CardSpec::TopUsers { .. } => row.cells.iter().map(span).collect(),
    };
    format!("<div class=\"{item_class}\">{inner}</div>")
}

fn section_class(base: &str, class: &str) -> String {
    if class.is_empty() {
        base.to_string()
    } else {
        format!("{base} {}", escape(class))
    }
}

/// Placeholder shown for an empty record list
#[must_use]
pub fn render_empty_card(title: &str, class: &str) -> Markup {
    Markup::raw(format!(
        "<div class=\"{}\"><h3>{}</h3><p class=\"card-body text-center\">No data available</p></div>",
        section_class("section card", class),
        escape(title)
    ))
}

/// Render a typed card
#[must_use]
pub fn render_card(title: &str, class: &str, spec: &CardSpec, records: &[Value]) -> Markup {
    let title = spec.fixed_title().unwrap_or(title);
    if records.is_empty() {
        return render_empty_card(title, class);
    }

    let (container, item) = spec.classes();
    let rows: String = spec
        .project(records)
        .iter()
        .map(|row| render_row(spec, row, item))
        .collect();

    Markup::raw(format!(
        "<div class=\"{}\"><h3>{}</h3><div class=\"{container}\">{rows}</div></div>",
        section_class("section", class),
        escape(title)
    ))
}

/// Render a card from a numeric layout tag
///
/// An empty record list gets the placeholder whatever the tag; an unknown
/// tag with records gets a visible fallback.
#[must_use]
pub fn render_data_card(
    title: &str,
    class: &str,
    tag: u8,
    records: &[Value],
    params: &LegacyCardParams,
) -> Markup {
    let spec = CardSpec::from_legacy(tag, params);
    let title = spec.as_ref().and_then(CardSpec::fixed_title).unwrap_or(title);

    if records.is_empty() {
        return render_empty_card(title, class);
    }

    match spec {
        Some(spec) => render_card(title, class, &spec, records),
        None => Markup::raw(format!(
            "<div class=\"{}\"><h3>{}</h3><div class=\"card-fallback\">No content for type {tag}</div></div>",
            section_class("section", class),
            escape(title)
        )),
    }
}
