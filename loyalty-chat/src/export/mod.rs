//! Exports of the chat log: report, JSON transcript, CSV and clipboard text.
//!
//! Everything here is pure except [`write_export`], which drops a rendered
//! export into a directory under its timestamped name.

mod clipboard;
mod csv_export;
mod format;
mod report;
mod transcript;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;

pub use clipboard::clipboard_text;
pub use csv_export::{account_ids_csv, metrics_csv, table_csv};
pub use format::{format_metric_value, format_number, metric_label};
pub use report::{strip_markup, Report, ReportOptions, REPORT_END, REPORT_TITLE};
pub use transcript::{EntryKind, Transcript, TranscriptEntry, ASSISTANT_LABEL, DEFAULT_USER_LABEL};

/// What is being exported. Decides the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Report,
    Transcript,
    Metrics,
    Table,
    AccountIds,
}

impl ExportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Transcript => "transcript",
            Self::Metrics => "metrics",
            Self::Table => "table",
            Self::AccountIds => "account_ids",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "report" => Some(Self::Report),
            "transcript" | "json" => Some(Self::Transcript),
            "metrics" => Some(Self::Metrics),
            "table" => Some(Self::Table),
            "account_ids" | "accounts" => Some(Self::AccountIds),
            _ => None,
        }
    }

    /// Whether the export belongs to a single message rather than the whole chat.
    pub const fn is_per_message(self) -> bool {
        matches!(self, Self::Metrics | Self::Table | Self::AccountIds)
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timestamp-suffixed file name for an export.
///
/// `message_id` is only used by per-message exports.
pub fn export_filename(kind: ExportKind, message_id: &str, at: DateTime<Utc>) -> String {
    let ms = at.timestamp_millis();
    match kind {
        ExportKind::Report => format!("bonnie-chat-{ms}.txt"),
        ExportKind::Transcript => format!("chat-transcript-{ms}.json"),
        ExportKind::Metrics => format!("metrics_{message_id}_{ms}.csv"),
        ExportKind::Table => format!("{message_id}_{ms}.csv"),
        ExportKind::AccountIds => format!("account_ids_{message_id}_{ms}.csv"),
    }
}

/// Write `contents` to `dir/name`, creating `dir` if needed.
pub fn write_export(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(path)
}
