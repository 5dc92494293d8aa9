//! Plain-text rendering of a single message for copying or sharing.

use super::format::{format_metric_value, metric_label};
use super::report::strip_markup;
use crate::models::{cell_text, Message};

/// Message text followed by its metrics, table ids and download link.
pub fn clipboard_text(message: &Message) -> String {
    let mut out = strip_markup(message.text.as_deref().unwrap_or_default());

    if let Some(metrics) = message.metrics.as_ref().filter(|m| !m.is_empty()) {
        out.push_str("\n\nMetrics:\n");
        let lines: Vec<String> = metrics
            .iter()
            .map(|(key, value)| format!("{}: {}", metric_label(key), format_metric_value(value)))
            .collect();
        out.push_str(&lines.join("\n"));
    }

    if let Some(table) = message.table_data.as_ref().filter(|t| !t.rows.is_empty()) {
        let lines = if table.account_column().is_some() {
            table.account_ids()
        } else {
            table
                .rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(" | "))
                .collect()
        };
        out.push_str("\n\nAccount IDs:\n");
        out.push_str(&lines.join("\n"));
    }

    if let Some(link) = message.file_link.as_deref().filter(|l| !l.is_empty()) {
        out.push_str("\n\nDownload Link: ");
        out.push_str(link);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{migrate_metrics, TableData};
    use serde_json::json;

    #[test]
    fn text_only() {
        assert_eq!(clipboard_text(&Message::assistant("<b>Hi</b>")), "Hi");
    }

    #[test]
    fn full_message() {
        let mut message = Message::assistant("Your segment");
        message.metrics = migrate_metrics(json!({"totalMembers": 1200}));
        message.table_data = Some(TableData {
            headers: vec!["account_id".into()],
            rows: vec![vec![json!("A1")], vec![json!("A2")]],
        });
        message.file_link = Some("https://files.example.com/seg.csv".into());

        assert_eq!(
            clipboard_text(&message),
            "Your segment\n\nMetrics:\nTotal Members: 1,200\n\nAccount IDs:\nA1\nA2\n\n\
             Download Link: https://files.example.com/seg.csv"
        );
    }

    #[test]
    fn rows_without_account_column() {
        let mut message = Message::assistant("Tiers");
        message.table_data = Some(TableData {
            headers: vec!["Tier".into(), "Members".into()],
            rows: vec![vec![json!("Gold"), json!(10)]],
        });
        assert_eq!(clipboard_text(&message), "Tiers\n\nAccount IDs:\nGold | 10");
    }
}
