//! Minimal HTML building blocks
//!
//! Pages are rendered as strings. Text that comes from the backend always
//! goes through [`escape`] before it is placed in markup.

use axum::response::{Html, IntoResponse, Response};
use serde_json::Value;
use std::fmt;

/// A fragment of trusted HTML
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    /// Empty fragment
    #[must_use]
    pub const fn new() -> Self {
        Self(String::new())
    }

    /// Wrap HTML that is already safe to emit
    #[must_use]
    pub fn raw(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// Escaped text
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self(escape(text))
    }

    /// `<tag class="class">inner</tag>`; an empty class omits the attribute
    #[must_use]
    pub fn element(tag: &str, class: &str, inner: &Self) -> Self {
        if class.is_empty() {
            Self(format!("<{tag}>{}</{tag}>", inner.0))
        } else {
            Self(format!("<{tag} class=\"{}\">{}</{tag}>", escape(class), inner.0))
        }
    }

    /// Append another fragment
    pub fn push(&mut self, other: &Self) {
        self.0.push_str(&other.0);
    }

    /// Append trusted HTML
    pub fn push_raw(&mut self, html: &str) {
        self.0.push_str(html);
    }

    /// Append escaped text
    pub fn push_text(&mut self, text: &str) {
        self.0.push_str(&escape(text));
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the HTML
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the HTML
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromIterator<Self> for Markup {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        let mut out = Self::new();
        for part in iter {
            out.push(&part);
        }
        out
    }
}

impl IntoResponse for Markup {
    fn into_response(self) -> Response {
        Html(self.0).into_response()
    }
}

/// Escape text for use in element content and quoted attributes
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Text a JSON value shows as in a card
///
/// Whole numbers print without a fraction. Null, missing, arrays and
/// objects print nothing.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map_or_else(String::new, format_float)
            }
        }
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null | Value::Array(_) | Value::Object(_)) | None => String::new(),
    }
}

/// Shortest round-trip form, whole values without `.0`
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Look up `field` on a record and format it
#[must_use]
pub fn field_text(record: &Value, field: &str) -> String {
    display_value(record.get(field))
}

/// Numeric value of `field`, if it is a JSON number
#[must_use]
pub fn field_number(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}
