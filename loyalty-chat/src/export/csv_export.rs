//! CSV exports: metrics, tables and account ids.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::format::{format_metric_value, metric_label};
use crate::error::{ChatError, Result};
use crate::models::{cell_text, Metrics, TableData};

fn write_records<I, R>(quote_style: QuoteStyle, records: I) -> Result<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(quote_style)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    for record in records {
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ChatError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `Metric,Value` export of one message's metrics. Data cells are always quoted.
pub fn metrics_csv(metrics: &Metrics) -> Result<String> {
    let rows = metrics
        .iter()
        .map(|(key, value)| [metric_label(key), format_metric_value(value)]);
    let body = write_records(QuoteStyle::Always, rows)?;
    Ok(format!("Metric,Value\n{body}"))
}

/// Full table export, headers first, every cell quoted.
pub fn table_csv(table: &TableData) -> Result<String> {
    let header = std::iter::once(table.headers.clone());
    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    write_records(QuoteStyle::Always, header.chain(rows))
}

/// One account id per line under an `Account_ID` header.
pub fn account_ids_csv(ids: &[String]) -> Result<String> {
    let header = std::iter::once(vec!["Account_ID".to_string()]);
    let rows = ids.iter().map(|id| vec![id.clone()]);
    write_records(QuoteStyle::Necessary, header.chain(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::migrate_metrics;
    use serde_json::json;

    #[test]
    fn metrics_export() {
        let metrics = migrate_metrics(json!({
            "totalMembers": 1234.5,
            "isActive": true,
            "avgSpend": "$1234.5 per month"
        }))
        .unwrap();

        let csv = metrics_csv(&metrics).unwrap();
        assert_eq!(
            csv,
            "Metric,Value\n\
             \"Total Members\",\"1,234.50\"\n\
             \"Is Active\",\"Yes\"\n\
             \"Avg Spend\",\"$1,234.50 per month\"\n"
        );
    }

    #[test]
    fn legacy_metrics_export() {
        let metrics = migrate_metrics(json!([{"total_spend": 1000, "gone": null}])).unwrap();
        let csv = metrics_csv(&metrics).unwrap();
        assert_eq!(csv, "Metric,Value\n\"Total Spend\",\"1,000\"\n");
    }

    #[test]
    fn table_export_quotes_everything() {
        let table = TableData {
            headers: vec!["Account".into(), "Name".into()],
            rows: vec![vec![json!("A1"), json!("Ann \"The\" Member")], vec![json!(2), json!(null)]],
        };
        let csv = table_csv(&table).unwrap();
        assert_eq!(
            csv,
            "\"Account\",\"Name\"\n\"A1\",\"Ann \"\"The\"\" Member\"\n\"2\",\"\"\n"
        );
    }

    #[test]
    fn account_ids_export() {
        let csv = account_ids_csv(&["A1".into(), "A2".into()]).unwrap();
        assert_eq!(csv, "Account_ID\nA1\nA2\n");
    }
}
