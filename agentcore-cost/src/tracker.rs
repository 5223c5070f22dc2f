//! The cost/usage tracker facade: computes cost from token counts,
//! persists the resulting record, and answers aggregation queries.

use crate::error::CostError;
use crate::export::{self, ExportFormat};
use crate::pricing::PricingTable;
use crate::store::CostStore;
use agentcore_types::{CostSelector, CostSummary, SessionId, UsageRecord};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

/// Observes every model call and accumulates cost/usage totals.
pub struct CostTracker {
    store: CostStore,
    pricing: PricingTable,
}

impl CostTracker {
    /// Build a tracker persisting under `root`, priced by `pricing`.
    pub fn new(root: impl Into<std::path::PathBuf>, pricing: PricingTable) -> Self {
        Self {
            store: CostStore::new(root),
            pricing,
        }
    }

    /// Price and persist one model call's usage.
    ///
    /// Invoked by the model-call layer's usage callback. A persistence
    /// failure is logged and swallowed — cost accounting must never
    /// break inference.
    pub async fn record_usage(
        &self,
        session_id: SessionId,
        model: impl Into<String>,
        provider: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
    ) {
        let model = model.into();
        let provider = provider.into();
        let priced = self
            .pricing
            .price(&model, &provider, input_tokens, output_tokens, cached_tokens);
        let record = UsageRecord {
            session_id,
            model,
            provider,
            input_tokens,
            output_tokens,
            cached_tokens,
            input_cost: priced.input_cost,
            output_cost: priced.output_cost,
            total_cost: priced.total_cost,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.append(&record).await {
            warn!(error = %e, session_id = %record.session_id, "failed to persist usage record");
        }
    }

    /// Total cost for one session.
    pub async fn session_cost(&self, session_id: &SessionId) -> CostSummary {
        self.summarize(self.store.read_session(session_id).await.unwrap_or_default())
    }

    /// Total cost for one UTC calendar date.
    pub async fn daily_cost(&self, date: NaiveDate) -> CostSummary {
        self.summarize(self.store.read_date(date).await.unwrap_or_default())
    }

    /// Total cost for one UTC calendar month.
    pub async fn monthly_cost(&self, year: i32, month: u32) -> CostSummary {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return CostSummary::default();
        };
        let last = last_day_of_month(year, month);
        self.range_cost_raw(first, last).await
    }

    /// Total cost over `[from, to]`, optionally filtered.
    pub async fn range_cost(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: Option<&dyn Fn(&UsageRecord) -> bool>,
    ) -> CostSummary {
        let mut summary = CostSummary::default();
        let Ok(dates) = self
            .store
            .dates_in_range(from.date_naive(), to.date_naive())
            .await
        else {
            return summary;
        };
        for date in dates {
            let Ok(records) = self.store.read_date(date).await else {
                continue;
            };
            for record in records {
                if record.timestamp < from || record.timestamp > to {
                    continue;
                }
                if let Some(filter) = filter {
                    if !filter(&record) {
                        continue;
                    }
                }
                summary.accumulate(&record);
            }
        }
        summary
    }

    /// Resolve any [`CostSelector`] to its summary.
    pub async fn query(&self, selector: CostSelector) -> CostSummary {
        match selector {
            CostSelector::BySession(id) => self.session_cost(&id).await,
            CostSelector::ByDate(date) => self.daily_cost(date).await,
            CostSelector::ByMonth { year, month } => self.monthly_cost(year, month).await,
            CostSelector::ByRange { from, to } => self.range_cost(from, to, None).await,
        }
    }

    /// Render the records matching `selector` (after an optional extra
    /// predicate) in the requested format.
    pub async fn export(
        &self,
        selector: CostSelector,
        extra_filter: Option<&dyn Fn(&UsageRecord) -> bool>,
        format: ExportFormat,
    ) -> Result<Vec<u8>, CostError> {
        let mut records = self.records_for(selector).await;
        if let Some(filter) = extra_filter {
            records.retain(|r| filter(r));
        }
        export::render(&records, format)
    }

    async fn records_for(&self, selector: CostSelector) -> Vec<UsageRecord> {
        match selector {
            CostSelector::BySession(id) => self.store.read_session(&id).await.unwrap_or_default(),
            CostSelector::ByDate(date) => self.store.read_date(date).await.unwrap_or_default(),
            CostSelector::ByMonth { year, month } => {
                let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
                    return Vec::new();
                };
                let last = last_day_of_month(year, month);
                let Ok(dates) = self.store.dates_in_range(first, last).await else {
                    return Vec::new();
                };
                let mut all = Vec::new();
                for date in dates {
                    all.extend(self.store.read_date(date).await.unwrap_or_default());
                }
                all
            }
            CostSelector::ByRange { from, to } => {
                let Ok(dates) = self.store.dates_in_range(from.date_naive(), to.date_naive()).await else {
                    return Vec::new();
                };
                let mut all = Vec::new();
                for date in dates {
                    for record in self.store.read_date(date).await.unwrap_or_default() {
                        if record.timestamp >= from && record.timestamp <= to {
                            all.push(record);
                        }
                    }
                }
                all
            }
        }
    }

    async fn range_cost_raw(&self, from: NaiveDate, to: NaiveDate) -> CostSummary {
        let mut summary = CostSummary::default();
        let Ok(dates) = self.store.dates_in_range(from, to).await else {
            return summary;
        };
        for date in dates {
            if let Ok(records) = self.store.read_date(date).await {
                for record in records {
                    summary.accumulate(&record);
                }
            }
        }
        summary
    }

    fn summarize(&self, records: Vec<UsageRecord>) -> CostSummary {
        let mut summary = CostSummary::default();
        for record in records {
            summary.accumulate(&record);
        }
        summary
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_usage_is_queryable_by_session() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(dir.path(), PricingTable::with_builtin_defaults());
        let session_id = SessionId::new("s1");
        tracker
            .record_usage(session_id.clone(), "gpt-4o", "openai", 1000, 500, 0)
            .await;
        let summary = tracker.session_cost(&session_id).await;
        assert_eq!(summary.record_count, 1);
        assert_eq!(summary.input_tokens, 1000);
    }

    #[tokio::test]
    async fn record_usage_breaks_down_by_model_and_provider() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(dir.path(), PricingTable::with_builtin_defaults());
        let session_id = SessionId::new("s1");
        tracker
            .record_usage(session_id.clone(), "gpt-4o", "openai", 1000, 500, 0)
            .await;
        tracker
            .record_usage(session_id, "claude-3-5-sonnet", "anthropic", 2000, 1000, 0)
            .await;
        let summary = tracker.daily_cost(Utc::now().date_naive()).await;
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.by_model.len(), 2);
        assert_eq!(summary.by_provider.len(), 2);
    }

    #[tokio::test]
    async fn monthly_cost_spans_the_whole_month() {
        use chrono::Datelike;
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(dir.path(), PricingTable::with_builtin_defaults());
        let session_id = SessionId::new("s1");
        tracker
            .record_usage(session_id, "gpt-4o", "openai", 1000, 500, 0)
            .await;
        let now = Utc::now();
        let summary = tracker.monthly_cost(now.year(), now.month()).await;
        assert_eq!(summary.record_count, 1);
    }

    #[tokio::test]
    async fn export_renders_matching_records() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(dir.path(), PricingTable::with_builtin_defaults());
        let session_id = SessionId::new("s1");
        tracker
            .record_usage(session_id.clone(), "gpt-4o", "openai", 1000, 500, 0)
            .await;
        let bytes = tracker
            .export(CostSelector::BySession(session_id), None, crate::export::ExportFormat::Json)
            .await
            .unwrap();
        let records: Vec<UsageRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn query_selector_dispatches_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(dir.path(), PricingTable::with_builtin_defaults());
        let session_id = SessionId::new("s1");
        tracker
            .record_usage(session_id.clone(), "gpt-4o", "openai", 1000, 500, 0)
            .await;
        let summary = tracker.query(CostSelector::BySession(session_id)).await;
        assert_eq!(summary.record_count, 1);
    }
}
