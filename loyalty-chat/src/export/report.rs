//! Paginated plain-text report of a conversation.
//!
//! Each page carries the report title as a header and a `Page X of Y`
//! footer. Message blocks flow across pages line by line.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::format::{format_metric_value, metric_label};
use crate::models::{cell_text, Message, TableData};

pub const REPORT_TITLE: &str = "Chat Transcript - Bonnie AI Assistant";
pub const REPORT_END: &str = "End of Chat Transcript";

const ASSISTANT_LABEL: &str = "Bonnie AI";
const DEFAULT_USER_LABEL: &str = "You";
const HEADER_LINES: usize = 3;
const FOOTER_LINES: usize = 2;

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>").expect("break pattern is valid"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#\d+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid"));

/// Layout settings for [`Report::build`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Shown instead of `You` for user messages.
    pub username: Option<String>,
    pub lines_per_page: usize,
    pub width: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            username: None,
            lines_per_page: 60,
            width: 90,
        }
    }
}

/// A laid-out report.
#[derive(Debug, Clone)]
pub struct Report {
    title: String,
    width: usize,
    pages: Vec<Vec<String>>,
}

impl Report {
    /// Lay out every message, in order, into pages.
    pub fn build(messages: &[Message], options: &ReportOptions, generated_at: DateTime<Utc>) -> Self {
        let width = options.width.max(20);
        let body = body_lines(messages, options, width, generated_at);

        let per_page = options
            .lines_per_page
            .saturating_sub(HEADER_LINES + FOOTER_LINES)
            .max(1);
        let mut pages: Vec<Vec<String>> = body.chunks(per_page).map(<[String]>::to_vec).collect();
        if pages.is_empty() {
            pages.push(Vec::new());
        }

        Self {
            title: options.title.clone(),
            width,
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Body lines of every page, without headers and footers.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flatten().map(String::as_str)
    }

    /// Render the full document.
    pub fn render(&self) -> String {
        let total = self.pages.len();
        let rule = "=".repeat(self.width);
        let mut out = String::new();

        for (idx, page) in self.pages.iter().enumerate() {
            if idx > 0 {
                out.push('\u{c}');
            }
            out.push_str(&self.title);
            out.push('\n');
            out.push_str(&rule);
            out.push_str("\n\n");
            for line in page {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&format!("Page {} of {total}\n", idx + 1));
        }
        out
    }
}

fn body_lines(
    messages: &[Message],
    options: &ReportOptions,
    width: usize,
    generated_at: DateTime<Utc>,
) -> Vec<String> {
    let user_label = options
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(DEFAULT_USER_LABEL);
    let separator = "-".repeat(width);

    let mut lines = vec![
        format!("Generated on: {}", generated_at.format("%B %-d, %Y %-I:%M %p")),
        String::new(),
    ];

    for (idx, message) in messages.iter().enumerate() {
        lines.push(format!("Message {}", idx + 1));
        lines.push(if message.is_user() { user_label } else { ASSISTANT_LABEL }.to_string());

        let text = strip_markup(message.text.as_deref().unwrap_or_default());
        for paragraph in text.lines() {
            lines.extend(wrap(paragraph, width));
        }

        if let Some(metrics) = message.metrics.as_ref().filter(|m| !m.is_empty()) {
            lines.push(String::new());
            lines.push("Key Performance Indicators".to_string());
            for (key, value) in metrics {
                let entry = format!("{}: {}", metric_label(key), format_metric_value(value));
                lines.extend(wrap(&entry, width).into_iter().map(|l| format!("  {l}")));
            }
        }

        if let Some(table) = &message.table_data {
            let ids = flatten_table(table);
            if !ids.is_empty() {
                lines.push(String::new());
                lines.push(format!("Account IDs ({} total)", ids.len()));
                let wrapped = wrap(&ids.join(", "), width.saturating_sub(2));
                lines.extend(wrapped.into_iter().map(|l| format!("  {l}")));
            }
        }

        lines.push(message.timestamp.format("%-I:%M %p").to_string());
        lines.push(separator.clone());
    }

    lines.push(REPORT_END.to_string());
    lines
}

/// Account ids, or every row joined with ` | ` when the table has no
/// account column.
fn flatten_table(table: &TableData) -> Vec<String> {
    if table.account_column().is_some() {
        return table.account_ids();
    }
    table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(" | "))
        .filter(|row| !row.trim().is_empty())
        .collect()
}

/// Strip HTML markup, turning line breaks into newlines and decoding entities.
pub fn strip_markup(text: &str) -> String {
    let text = BREAK_RE.replace_all(text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = ENTITY_RE.replace_all(&text, |caps: &regex::Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    text.trim().to_string()
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::migrate_metrics;
    use serde_json::json;

    fn answer_with_table() -> Message {
        let mut message = Message::assistant("Here are your <b>top</b> members:<br>Gold &amp; Platinum");
        message.metrics = migrate_metrics(json!({"totalMembers": 1234.5, "isActive": true}));
        message.table_data = Some(TableData {
            headers: vec!["Account_ID".into(), "Tier".into()],
            rows: (1..=15).map(|i| vec![json!(format!("A{i}")), json!("Gold")]).collect(),
        });
        message
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(strip_markup("<p>Hi <b>there</b></p>"), "Hi there");
        assert_eq!(strip_markup("a<br/>b"), "a\nb");
        assert_eq!(strip_markup("1 &lt; 2 &#38; &#x41;"), "1 < 2 & A");
        assert_eq!(strip_markup("&bogus;"), "&bogus;");
    }

    #[test]
    fn wrapping() {
        assert_eq!(wrap("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn report_contains_everything_in_order() {
        let messages = vec![Message::user("Show top members"), answer_with_table()];
        let report = Report::build(&messages, &ReportOptions::default(), Utc::now());
        let body: Vec<&str> = report.lines().collect();
        let text = body.join("\n");

        let first = text.find("Show top members").unwrap();
        let second = text.find("Here are your top members:").unwrap();
        assert!(first < second);
        assert!(body.contains(&"Message 1"));
        assert!(body.contains(&"Message 2"));
        assert!(body.contains(&"You"));
        assert!(body.contains(&"Bonnie AI"));
        assert!(body.contains(&"Gold & Platinum"));
        assert!(body.contains(&"Key Performance Indicators"));
        assert!(body.contains(&"  Total Members: 1,234.50"));
        assert!(body.contains(&"  Is Active: Yes"));
        assert!(body.contains(&"Account IDs (15 total)"));
        assert!(text.contains("A1, A2"));
        assert!(text.contains("A15"));
        assert_eq!(body.last(), Some(&REPORT_END));
    }

    #[test]
    fn rows_are_flattened_without_account_column() {
        let table = TableData {
            headers: vec!["Name".into(), "Tier".into()],
            rows: vec![vec![json!("Ann"), json!("Gold")]],
        };
        assert_eq!(flatten_table(&table), vec!["Ann | Gold"]);
    }

    #[test]
    fn pagination() {
        let messages: Vec<Message> = (0..20).map(|i| Message::user(format!("question {i}"))).collect();
        let options = ReportOptions {
            username: Some("Ann".into()),
            lines_per_page: 15,
            ..ReportOptions::default()
        };
        let report = Report::build(&messages, &options, Utc::now());
        assert!(report.page_count() > 1);

        let rendered = report.render();
        let total = report.page_count();
        for page in 1..=total {
            assert!(rendered.contains(&format!("Page {page} of {total}")));
        }
        assert_eq!(rendered.matches(REPORT_TITLE).count(), total);
        assert!(rendered.contains("question 19"));
        assert!(report.lines().any(|l| l == "Ann"));
    }
}
