//! Display strings for dashboard metrics.
//!
//! A metric is either a number, a number that could not be computed because its data reduced to
//! nothing ([`MetricValue::NoData`]), or a metric whose source column does not exist at all
//! ([`MetricValue::Unresolved`]). The two missing states always render differently.

#![forbid(unsafe_code)]

pub mod locale;

pub use locale::{format_fixed, get_locale, Grouping, NumberLocale, DE_DE, EN_IN, EN_US, FR_FR};

/// Rendered for metrics whose source column was never found.
pub const UNRESOLVED_TEXT: &str = "\u{2014}";
/// Rendered for metrics whose data reduced to nothing.
pub const NO_DATA_TEXT: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Unresolved,
    NoData,
    Number(f64),
}

impl MetricValue {
    /// `None` and non-finite numbers are [`MetricValue::NoData`].
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(n) if n.is_finite() => MetricValue::Number(n),
            _ => MetricValue::NoData,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        Self::from_option(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Whole numbers grouped (`12,345`); fractional values get two decimals.
    Count,
    /// Truncated toward zero, then grouped.
    Approx,
    /// Two decimals and a trailing `%`. Not clamped.
    Percent,
    /// Grouped with exactly two decimals.
    CurrencyLike,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormatOptions {
    pub locale: NumberLocale,
}

pub fn format_metric(value: MetricValue, kind: MetricKind) -> String {
    format_metric_with_options(value, kind, &FormatOptions::default())
}

pub fn format_metric_with_options(
    value: MetricValue,
    kind: MetricKind,
    options: &FormatOptions,
) -> String {
    let n = match value {
        MetricValue::Unresolved => return UNRESOLVED_TEXT.to_string(),
        MetricValue::NoData => return NO_DATA_TEXT.to_string(),
        MetricValue::Number(n) if !n.is_finite() => return NO_DATA_TEXT.to_string(),
        MetricValue::Number(n) => n,
    };

    let locale = &options.locale;
    match kind {
        MetricKind::Count if n.fract() == 0.0 => format_fixed(n, 0, locale),
        MetricKind::Count => format_fixed(n, 2, locale),
        MetricKind::Approx => format_fixed(n.trunc(), 0, locale),
        MetricKind::Percent => format!("{}%", format_fixed(n, 2, locale)),
        MetricKind::CurrencyLike => format_fixed(n, 2, locale),
    }
}
