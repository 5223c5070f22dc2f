//! Rendering a set of usage records as CSV or JSON for external
//! consumption (billing dashboards, spreadsheets).

use agentcore_types::UsageRecord;
use crate::error::CostError;

/// Output format for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One row per record, header included.
    Csv,
    /// A JSON array of records.
    Json,
}

/// Render `records` in the requested format.
pub fn render(records: &[UsageRecord], format: ExportFormat) -> Result<Vec<u8>, CostError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
        ExportFormat::Csv => render_csv(records),
    }
}

fn render_csv(records: &[UsageRecord]) -> Result<Vec<u8>, CostError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "session_id",
            "model",
            "provider",
            "input_tokens",
            "output_tokens",
            "cached_tokens",
            "input_cost",
            "output_cost",
            "total_cost",
            "timestamp",
        ])
        .map_err(|e| CostError::Io(e.to_string()))?;
    for record in records {
        writer
            .write_record([
                record.session_id.as_str(),
                &record.model,
                &record.provider,
                &record.input_tokens.to_string(),
                &record.output_tokens.to_string(),
                &record.cached_tokens.to_string(),
                &record.input_cost.to_string(),
                &record.output_cost.to_string(),
                &record.total_cost.to_string(),
                &record.timestamp.to_rfc3339(),
            ])
            .map_err(|e| CostError::Io(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| CostError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::SessionId;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record() -> UsageRecord {
        UsageRecord {
            session_id: SessionId::new("s1"),
            model: "gpt-4o".into(),
            provider: "openai".into(),
            input_tokens: 100,
            output_tokens: 50,
            cached_tokens: 0,
            input_cost: Decimal::new(25, 2),
            output_cost: Decimal::new(75, 2),
            total_cost: Decimal::new(1, 0),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn json_export_roundtrips() {
        let records = vec![record()];
        let bytes = render(&records, ExportFormat::Json).unwrap();
        let back: Vec<UsageRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].session_id, records[0].session_id);
    }

    #[test]
    fn csv_export_has_header_and_one_row_per_record() {
        let records = vec![record(), record()];
        let bytes = render(&records, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("gpt-4o"));
    }
}
