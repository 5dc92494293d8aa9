//! Display formatting for metric names and values.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([$£€¥₹])\s*([0-9,.\-]+)\s*(.*)$").expect("currency pattern is valid")
});
static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9,.\-]+)\s*([a-zA-Z%]+.*?)$").expect("unit pattern is valid")
});
static FLOAT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float pattern is valid")
});

const MIN_FRACTION_DIGITS: usize = 2;
const MAX_FRACTION_DIGITS: usize = 20;

/// Format a number the way the metrics panel shows it.
///
/// Integers get thousands separators (`1,234`); other values keep between 2
/// and 20 fraction digits (`1,234.50`).
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let negative = value < 0.0;
    let abs = value.abs();
    let mut repr = abs.to_string();
    let too_long = repr
        .split_once('.')
        .is_some_and(|(_, frac)| frac.len() > MAX_FRACTION_DIGITS);
    if too_long {
        repr = format!("{abs:.prec$}", prec = MAX_FRACTION_DIGITS);
    }

    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if negative && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));

    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
        for _ in frac_part.len()..MIN_FRACTION_DIGITS {
            out.push('0');
        }
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parse the longest numeric prefix of `s`, ignoring thousands separators.
fn parse_number_prefix(s: &str) -> Option<f64> {
    let cleaned = s.replace(',', "");
    let cleaned = cleaned.trim_start();
    FLOAT_PREFIX_RE
        .find(cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Format a metric value for display and export.
///
/// - numbers go through [`format_number`]
/// - `"$1234.5 per month"` becomes `"$1,234.50 per month"`
/// - `"12.5%"` becomes `"12.50 %"`
/// - numeric strings are reformatted, other strings pass through
/// - booleans become `Yes`/`No`, null becomes `N/A`
pub fn format_metric_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        Value::String(s) => format_metric_text(s),
        other => other.to_string(),
    }
}

fn format_metric_text(s: &str) -> String {
    if let Some(caps) = CURRENCY_RE.captures(s) {
        if let Some(number) = parse_number_prefix(&caps[2]) {
            let suffix = &caps[3];
            let formatted = format_number(number);
            return if suffix.is_empty() {
                format!("{}{formatted}", &caps[1])
            } else {
                format!("{}{formatted} {suffix}", &caps[1])
            };
        }
    }

    if let Some(caps) = UNIT_RE.captures(s) {
        if let Some(number) = parse_number_prefix(&caps[1]) {
            return format!("{} {}", format_number(number), &caps[2]);
        }
    }

    parse_number_prefix(s).map_or_else(|| s.to_string(), format_number)
}

/// Turn a metric key into a label: `totalMembers` and `total_members` both
/// become `Total Members`.
pub fn metric_label(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
            spaced.push(ch);
        } else if ch == '_' || ch == '-' {
            spaced.push(' ');
        } else {
            spaced.push(ch);
        }
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers() {
        assert_eq!(format_number(1234.0), "1,234");
        assert_eq!(format_number(1234.5), "1,234.50");
        assert_eq!(format_number(1_234_567.125), "1,234,567.125");
        assert_eq!(format_number(0.1), "0.10");
        assert_eq!(format_number(-9876.0), "-9,876");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn metric_value_examples() {
        assert_eq!(format_metric_value(&json!(1234.5)), "1,234.50");
        assert_eq!(format_metric_value(&json!(true)), "Yes");
        assert_eq!(format_metric_value(&json!(false)), "No");
        assert_eq!(format_metric_value(&json!("$1234.5 per month")), "$1,234.50 per month");
    }

    #[test]
    fn strings() {
        assert_eq!(format_metric_value(&json!("€1,000")), "€1,000");
        assert_eq!(format_metric_value(&json!("£ 99.9")), "£99.90");
        assert_eq!(format_metric_value(&json!("12.5%")), "12.50 %");
        assert_eq!(format_metric_value(&json!("45000 points")), "45,000 points");
        assert_eq!(format_metric_value(&json!("1,234,567")), "1,234,567");
        assert_eq!(format_metric_value(&json!("Gold tier")), "Gold tier");
        assert_eq!(format_metric_value(&Value::Null), "N/A");
    }

    #[test]
    fn labels() {
        assert_eq!(metric_label("totalMembers"), "Total Members");
        assert_eq!(metric_label("total_spend"), "Total Spend");
        assert_eq!(metric_label("days-since-last-transaction"), "Days Since Last Transaction");
        assert_eq!(metric_label("isActive"), "Is Active");
    }
}
