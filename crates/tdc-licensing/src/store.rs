//! License Record Storage
//!
//! Append-only bookkeeping of issued licenses. The only mutation after insert
//! is flipping `email_sent` once delivery succeeds.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::{LicensingError, Result};
use crate::record::{sort_newest_first, IssuanceStats, LicenseRecord};

/// License storage trait
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Append a record
    async fn append(&self, record: &LicenseRecord) -> Result<()>;

    /// Set `email_sent` on the most recently appended record for `license_key`.
    ///
    /// Returns `false` when no record carries that key.
    async fn mark_email_sent(&self, license_key: &str, sent: bool) -> Result<bool>;

    /// All records, newest first
    async fn list(&self) -> Result<Vec<LicenseRecord>>;

    /// Totals plus the newest `recent_limit` records
    async fn stats(&self, recent_limit: usize) -> Result<IssuanceStats> {
        Ok(IssuanceStats::from_newest_first(self.list().await?, recent_limit))
    }
}

fn set_email_sent(records: &mut [LicenseRecord], license_key: &str, sent: bool) -> bool {
    match records.iter_mut().rev().find(|r| r.license_key == license_key) {
        Some(record) => {
            record.email_sent = sent;
            true
        }
        None => false,
    }
}

/// In-memory license store (for development and tests)
#[derive(Default)]
pub struct MemoryLicenseStore {
    records: RwLock<Vec<LicenseRecord>>,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn append(&self, record: &LicenseRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn mark_email_sent(&self, license_key: &str, sent: bool) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(set_email_sent(&mut records, license_key, sent))
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>> {
        let mut records = self.records.read().await.clone();
        sort_newest_first(&mut records);
        Ok(records)
    }
}

/// Records kept as a pretty-printed JSON array in one file.
///
/// Every write rewrites the whole file through a temp file and rename. A file
/// that fails to parse is reported, never replaced.
pub struct JsonFileLicenseStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileLicenseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<LicenseRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LicensingError::Storage(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "License file is corrupt");
            LicensingError::Storage(format!("parsing {}: {e}", self.path.display()))
        })
    }

    async fn persist(&self, records: &[LicenseRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(|e| {
            LicensingError::Storage(format!("writing {}: {e}", tmp.display()))
        })?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LicensingError::Storage(format!(
                "replacing {}: {e}",
                self.path.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl LicenseStore for JsonFileLicenseStore {
    async fn append(&self, record: &LicenseRecord) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        records.push(record.clone());
        self.persist(&records).await?;

        tracing::info!(license_key = %record.license_key, "License record saved");
        Ok(())
    }

    async fn mark_email_sent(&self, license_key: &str, sent: bool) -> Result<bool> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        if !set_email_sent(&mut records, license_key, sent) {
            return Ok(false);
        }
        self.persist(&records).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::LicenseCodec;
    use chrono::Duration;

    fn record(key: &str, offset_secs: i64) -> LicenseRecord {
        let mut r = LicenseRecord::new(
            &LicenseCodec::default().generate(),
            "buyer@example.com",
            "Ana",
            "ord_1",
            "ord_1",
            "Tu Dinero Claro",
        );
        r.license_key = key.into();
        r.created_at += Duration::seconds(offset_secs);
        r
    }

    #[tokio::test]
    async fn test_memory_store_lists_newest_first() {
        let store = MemoryLicenseStore::new();
        store.append(&record("TDC-2025-AAAAA", 0)).await.unwrap();
        store.append(&record("TDC-2025-TESTI", 10)).await.unwrap();
        store.append(&record("TDC-2025-0000K", 5)).await.unwrap();

        let keys: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.license_key)
            .collect();
        assert_eq!(keys, ["TDC-2025-TESTI", "TDC-2025-0000K", "TDC-2025-AAAAA"]);
    }

    #[tokio::test]
    async fn test_mark_email_sent_targets_latest_duplicate() {
        let store = MemoryLicenseStore::new();
        store.append(&record("TDC-2025-AAAAA", 0)).await.unwrap();
        store.append(&record("TDC-2025-AAAAA", 1)).await.unwrap();

        assert!(store.mark_email_sent("TDC-2025-AAAAA", true).await.unwrap());
        let records = store.list().await.unwrap();
        assert!(records[0].email_sent);
        assert!(!records[1].email_sent);

        assert!(!store.mark_email_sent("TDC-2025-TESTI", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_stats() {
        let store = MemoryLicenseStore::new();
        for i in 0..12 {
            store.append(&record("TDC-2025-AAAAA", i)).await.unwrap();
        }
        store.mark_email_sent("TDC-2025-AAAAA", true).await.unwrap();

        let stats = store.stats(10).await.unwrap();
        assert_eq!(stats.total_licenses, 12);
        assert_eq!(stats.emails_sent, 1);
        assert_eq!(stats.emails_failed, 11);
        assert_eq!(stats.recent_licenses.len(), 10);
        assert!(stats.recent_licenses[0].email_sent);
    }
}
