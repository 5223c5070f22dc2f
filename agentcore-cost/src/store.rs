//! Append-only JSON-lines persistence, partitioned by UTC date, with a
//! per-session index mapping `session_id -> [(date, file_offset)]`.

use crate::error::CostError;
use agentcore_types::{SessionId, UsageRecord};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One index entry: a day's file plus the byte offset the record starts
/// at, enough to seek straight to it without scanning the whole file.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct IndexEntry {
    /// UTC calendar date the record was partitioned under.
    pub date: NaiveDate,
    /// Byte offset of the record's line within that date's file.
    pub offset: u64,
}

/// Filesystem-backed append-only usage log.
///
/// Directory layout:
/// ```text
/// root/
///   2026-08-01/records.jsonl
///   index/<session_id>.json
/// ```
///
/// Writes take an advisory exclusive lock on the target date file (so
/// multiple processes sharing one root don't interleave lines) and an
/// in-process mutex around the index update.
pub struct CostStore {
    root: PathBuf,
    index_lock: Mutex<()>,
}

impl CostStore {
    /// Root the store at `root`, creating it lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_lock: Mutex::new(()),
        }
    }

    fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    fn records_path(&self, date: NaiveDate) -> PathBuf {
        self.date_dir(date).join("records.jsonl")
    }

    fn index_path(&self, session_id: &SessionId) -> PathBuf {
        self.root.join("index").join(format!("{}.json", session_id.as_str()))
    }

    /// Append one record, updating its session's index. Serialized
    /// in-process by an internal mutex; serialized across processes by
    /// an advisory lock on the date file.
    pub async fn append(&self, record: &UsageRecord) -> Result<(), CostError> {
        let date = record.timestamp.date_naive();
        let dir = self.date_dir(date);
        tokio::fs::create_dir_all(&dir).await?;

        let line = format!("{}\n", serde_json::to_string(record)?);
        let path = self.records_path(date);

        let _guard = self.index_lock.lock().await;
        let offset = append_line_locked(&path, &line).await?;
        self.append_index_entry(&record.session_id, IndexEntry { date, offset })
            .await?;
        Ok(())
    }

    async fn append_index_entry(
        &self,
        session_id: &SessionId,
        entry: IndexEntry,
    ) -> Result<(), CostError> {
        let path = self.index_path(session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut entries = self.read_index(session_id).await?;
        entries.push(entry);
        tokio::fs::write(&path, serde_json::to_string(&entries)?).await?;
        Ok(())
    }

    /// Index entries recorded for one session, oldest first.
    pub async fn read_index(&self, session_id: &SessionId) -> Result<Vec<IndexEntry>, CostError> {
        let path = self.index_path(session_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the record at `offset` within `date`'s file.
    pub async fn read_at(&self, date: NaiveDate, offset: u64) -> Result<UsageRecord, CostError> {
        let path = self.records_path(date);
        let contents = tokio::fs::read_to_string(&path).await?;
        let line = contents[offset as usize..]
            .lines()
            .next()
            .ok_or_else(|| CostError::Io(format!("no record at offset {offset} in {path:?}")))?;
        Ok(serde_json::from_str(line)?)
    }

    /// Every record stored for one UTC calendar date, in append order.
    pub async fn read_date(&self, date: NaiveDate) -> Result<Vec<UsageRecord>, CostError> {
        let path = self.records_path(date);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .filter(|l| !l.is_empty())
                .map(|l| serde_json::from_str(l).map_err(CostError::from))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// All records for every session recorded under `session_id`, using
    /// the index rather than scanning whole date files.
    pub async fn read_session(&self, session_id: &SessionId) -> Result<Vec<UsageRecord>, CostError> {
        let entries = self.read_index(session_id).await?;
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            records.push(self.read_at(entry.date, entry.offset).await?);
        }
        Ok(records)
    }

    /// Date directories present under the root, for range scans.
    pub async fn dates_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, CostError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(date) = NaiveDate::parse_from_str(name, "%Y-%m-%d") {
                    if date >= from && date <= to {
                        dates.push(date);
                    }
                }
            }
        }
        dates.sort();
        Ok(dates)
    }
}

async fn append_line_locked(path: &Path, line: &str) -> Result<u64, CostError> {
    let path = path.to_path_buf();
    let line = line.to_string();
    tokio::task::spawn_blocking(move || -> Result<u64, CostError> {
        use fs4::fs_std::FileExt;
        use std::io::{Seek, SeekFrom, Write};

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        FileExt::lock_exclusive(&file).map_err(|e| CostError::LockFailed(e.to_string()))?;
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        let _ = FileExt::unlock(&file);
        Ok(offset)
    })
    .await
    .map_err(|e| CostError::Io(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::SessionId;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record(session: &str) -> UsageRecord {
        UsageRecord {
            session_id: SessionId::new(session),
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

    #[tokio::test]
    async fn append_and_read_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = CostStore::new(dir.path());
        let r = record("s1");
        store.append(&r).await.unwrap();
        let date = r.timestamp.date_naive();
        let records = store.read_date(date).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, r.session_id);
    }

    #[tokio::test]
    async fn session_index_seeks_directly() {
        let dir = tempfile::tempdir().unwrap();
        let store = CostStore::new(dir.path());
        store.append(&record("s1")).await.unwrap();
        store.append(&record("s2")).await.unwrap();
        store.append(&record("s1")).await.unwrap();

        let session_records = store.read_session(&SessionId::new("s1")).await.unwrap();
        assert_eq!(session_records.len(), 2);
        assert!(session_records.iter().all(|r| r.session_id.as_str() == "s1"));
    }

    #[tokio::test]
    async fn read_nonexistent_date_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CostStore::new(dir.path());
        let records = store.read_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn dates_in_range_finds_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let store = CostStore::new(dir.path());
        let r = record("s1");
        store.append(&r).await.unwrap();
        let date = r.timestamp.date_naive();
        let dates = store.dates_in_range(date, date).await.unwrap();
        assert_eq!(dates, vec![date]);
    }
}
