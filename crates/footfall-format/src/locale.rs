/// How digits left of the decimal separator are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// `1,234,567`
    Thousands,
    /// `12,34,567`: the last three digits, then pairs.
    Indian,
}

/// Separator conventions used when rendering metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub id: &'static str,
    pub decimal_separator: char,
    pub thousands_separator: Option<char>,
    pub grouping: Grouping,
}

pub static EN_US: NumberLocale = NumberLocale {
    id: "en-US",
    decimal_separator: '.',
    thousands_separator: Some(','),
    grouping: Grouping::Thousands,
};

pub static EN_IN: NumberLocale = NumberLocale {
    id: "en-IN",
    decimal_separator: '.',
    thousands_separator: Some(','),
    grouping: Grouping::Indian,
};

pub static DE_DE: NumberLocale = NumberLocale {
    id: "de-DE",
    decimal_separator: ',',
    thousands_separator: Some('.'),
    grouping: Grouping::Thousands,
};

/// U+00A0 NO-BREAK SPACE groups thousands.
pub static FR_FR: NumberLocale = NumberLocale {
    id: "fr-FR",
    decimal_separator: ',',
    thousands_separator: Some('\u{00A0}'),
    grouping: Grouping::Thousands,
};

impl Default for NumberLocale {
    fn default() -> Self {
        EN_US
    }
}

fn normalize_locale_id(id: &str) -> Option<&'static str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return None;
    }

    // `_` and `-` are interchangeable; POSIX suffixes like `.UTF-8` and `@euro` are dropped.
    let mut key: String = trimmed
        .chars()
        .map(|ch| if ch == '_' { '-' } else { ch.to_ascii_lowercase() })
        .collect();
    if let Some(idx) = key.find(['.', '@']) {
        key.truncate(idx);
    }

    match key.as_str() {
        "en-us" | "en" => Some("en-US"),
        "en-in" | "hi-in" | "hi" => Some("en-IN"),
        "de-de" | "de" => Some("de-DE"),
        "fr-fr" | "fr" => Some("fr-FR"),
        _ => match key.split('-').next().unwrap_or("") {
            "en" => Some("en-US"),
            "de" => Some("de-DE"),
            "fr" => Some("fr-FR"),
            _ => None,
        },
    }
}

pub fn get_locale(id: &str) -> Option<&'static NumberLocale> {
    match normalize_locale_id(id)? {
        "en-US" => Some(&EN_US),
        "en-IN" => Some(&EN_IN),
        "de-DE" => Some(&DE_DE),
        "fr-FR" => Some(&FR_FR),
        _ => None,
    }
}

/// Render `value` with exactly `decimals` fraction digits and locale separators.
///
/// Values that round to zero never show a minus sign. Non-finite values render via `f64`'s
/// `Display`.
pub fn format_fixed(value: f64, decimals: usize, locale: &NumberLocale) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let digits = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
    let is_zero = digits.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    let grouped_int = match locale.thousands_separator {
        Some(sep) => group_digits(int_part, sep, locale.grouping),
        None => int_part.to_string(),
    };

    if frac_part.is_empty() {
        format!("{sign}{grouped_int}")
    } else {
        format!("{sign}{grouped_int}{}{frac_part}", locale.decimal_separator)
    }
}

fn group_digits(int_part: &str, sep: char, grouping: Grouping) -> String {
    let len = int_part.len();
    if len <= 3 {
        return int_part.to_string();
    }

    let (head, tail) = int_part.split_at(len - 3);
    let step = match grouping {
        Grouping::Thousands => 3,
        Grouping::Indian => 2,
    };

    let mut out = String::with_capacity(len + len / 2);
    let mut first_group = head.len() % step;
    if first_group == 0 {
        first_group = step;
    }
    out.push_str(&head[..first_group]);
    let mut i = first_group;
    while i < head.len() {
        out.push(sep);
        out.push_str(&head[i..i + step]);
        i += step;
    }
    out.push(sep);
    out.push_str(tail);
    out
}
