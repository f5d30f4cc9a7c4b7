use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::UserStore;
use super::error::{Result, StoreError};
use super::models::{ActivityLog, HistoryEntry, UserProfile, UserRecord, UserStats};
use super::partitions::{encode_log_key, encode_log_prefix, encode_user_key};
use super::pruning::{PruneStats, last_prune, prune_logs};

/// Fjall-backed user records and activity logs
pub struct FjallUserStore {
    keyspace: Keyspace,
    users: PartitionHandle,
    logs: PartitionHandle,
    metadata: PartitionHandle,
    history_limit: usize,
    /// Serializes read-modify-write; holds the last log timestamp handed out
    write_lock: Mutex<u64>,
}

impl FjallUserStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P, history_limit: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening user store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let users = keyspace.open_partition("users", PartitionCreateOptions::default())?;
        let logs = keyspace.open_partition("logs", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            users,
            logs,
            metadata,
            history_limit,
            write_lock: Mutex::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        match self.users.get(encode_user_key(user_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn write_user(&self, record: &UserRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.users.insert(encode_user_key(record.user_id), value)?;
        Ok(())
    }

    /// Millisecond timestamp of the last log prune, if one ever ran
    pub fn last_prune(&self) -> Result<Option<u64>> {
        last_prune(&self.metadata)
    }

    pub fn user_count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.users.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

impl UserStore for FjallUserStore {
    fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        self.read_user(user_id)
    }

    fn ensure_user(&self, profile: &UserProfile) -> Result<(UserRecord, bool)> {
        let _guard = self.lock();
        let now = Utc::now();

        match self.read_user(profile.user_id)? {
            Some(mut record) => {
                record.last_active = now;
                self.write_user(&record)?;
                Ok((record, false))
            }
            None => {
                let record = UserRecord::new(profile, now);
                self.write_user(&record)?;
                info!(user_id = profile.user_id, "created user record");
                Ok((record, true))
            }
        }
    }

    fn touch(&self, user_id: i64) -> Result<()> {
        let _guard = self.lock();
        let mut record = self
            .read_user(user_id)?
            .ok_or(StoreError::UserNotFound(user_id))?;
        record.last_active = Utc::now();
        self.write_user(&record)
    }

    fn record_delivery(&self, user_id: i64, entry: HistoryEntry) -> Result<UserRecord> {
        let _guard = self.lock();
        let mut record = self
            .read_user(user_id)?
            .ok_or(StoreError::UserNotFound(user_id))?;
        record.apply_delivery(entry, self.history_limit);
        self.write_user(&record)?;
        debug!(user_id, total = record.total_requests, "recorded delivery");
        Ok(record)
    }

    fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>> {
        Ok(self.read_user(user_id)?.map(|r| r.stats()))
    }

    fn append_log(&self, entry: &ActivityLog) -> Result<()> {
        let mut last_ms = self.lock();
        // Keys must be unique per user; bump past entries in the same millisecond
        let ts = (entry.timestamp.timestamp_millis().max(0) as u64).max(*last_ms + 1);
        *last_ms = ts;

        let value = serde_json::to_vec(entry)?;
        self.logs.insert(encode_log_key(entry.user_id, ts), value)?;
        Ok(())
    }

    fn recent_logs(&self, user_id: i64, limit: usize) -> Result<Vec<ActivityLog>> {
        let mut entries = Vec::new();
        for item in self.logs.prefix(encode_log_prefix(user_id)).rev().take(limit) {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    fn prune_logs(&self, ttl: Duration) -> Result<PruneStats> {
        let _guard = self.lock();
        prune_logs(&self.logs, &self.metadata, ttl)
    }

    fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LinkOutcome;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_store(history_limit: usize) -> (FjallUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallUserStore::open(temp_dir.path().join("users"), history_limit).unwrap();
        (store, temp_dir)
    }

    fn profile(user_id: i64) -> UserProfile {
        UserProfile {
            user_id,
            first_name: "Grace".to_string(),
            last_name: None,
            username: Some("grace".to_string()),
        }
    }

    fn history(name: &str) -> HistoryEntry {
        HistoryEntry {
            file_name: name.to_string(),
            displayed_size: "1.00 KB".to_string(),
            size_bytes: 1024,
            download_url: format!("https://cdn.example/{name}"),
            timestamp: Utc::now(),
        }
    }

    fn log(user_id: i64, link: &str, outcome: LinkOutcome) -> ActivityLog {
        ActivityLog {
            user_id,
            link: link.to_string(),
            outcome,
            file_name: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_user_creates_then_touches() {
        let (store, _temp) = create_test_store(100);

        let (created, is_new) = store.ensure_user(&profile(1)).unwrap();
        assert!(is_new);
        assert_eq!(created.total_requests, 0);

        let (again, is_new) = store.ensure_user(&profile(1)).unwrap();
        assert!(!is_new);
        assert_eq!(again.first_seen, created.first_seen);
        assert!(again.last_active >= created.last_active);
    }

    #[test]
    fn test_get_missing_user() {
        let (store, _temp) = create_test_store(100);
        assert!(store.get_user(404).unwrap().is_none());
        assert!(store.user_stats(404).unwrap().is_none());
        assert!(matches!(store.touch(404), Err(StoreError::UserNotFound(404))));
    }

    #[test]
    fn test_record_delivery_updates_counters_and_history() {
        let (store, _temp) = create_test_store(2);
        store.ensure_user(&profile(5)).unwrap();

        for name in ["a", "b", "c"] {
            store.record_delivery(5, history(name)).unwrap();
        }

        let record = store.get_user(5).unwrap().unwrap();
        assert_eq!(record.total_requests, 3);
        assert_eq!(record.links_processed, 3);
        assert_eq!(record.download_history.len(), 2);
        assert_eq!(record.download_history[0].file_name, "b");

        let stats = store.user_stats(5).unwrap().unwrap();
        assert_eq!(stats.downloaded_bytes, 2048);
    }

    #[test]
    fn test_record_delivery_requires_user() {
        let (store, _temp) = create_test_store(100);
        assert!(matches!(
            store.record_delivery(9, history("x")),
            Err(StoreError::UserNotFound(9))
        ));
    }

    #[test]
    fn test_concurrent_deliveries_are_not_lost() {
        let (store, _temp) = create_test_store(0);
        let store = Arc::new(store);
        store.ensure_user(&profile(3)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store.record_delivery(3, history(&format!("{i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = store.get_user(3).unwrap().unwrap();
        assert_eq!(record.total_requests, 40);
        assert_eq!(record.download_history.len(), 40);
    }

    #[test]
    fn test_recent_logs_newest_first_per_user() {
        let (store, _temp) = create_test_store(100);
        for i in 0..5 {
            store
                .append_log(&log(1, &format!("https://terabox.com/s/{i}"), LinkOutcome::Delivered))
                .unwrap();
        }
        store.append_log(&log(2, "other", LinkOutcome::ResolveFailed)).unwrap();

        let recent = store.recent_logs(1, 3).unwrap();
        let links: Vec<_> = recent.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://terabox.com/s/4",
                "https://terabox.com/s/3",
                "https://terabox.com/s/2"
            ]
        );
        assert_eq!(store.recent_logs(2, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_logs_drops_expired_entries() {
        let (store, _temp) = create_test_store(100);
        let mut old = log(1, "old", LinkOutcome::DownloadFailed);
        old.timestamp = Utc::now() - ChronoDuration::days(40);
        // Written first so the monotonic bump does not lift its key timestamp
        store.append_log(&old).unwrap();
        store.append_log(&log(1, "fresh", LinkOutcome::Delivered)).unwrap();

        assert!(store.last_prune().unwrap().is_none());
        let stats = store.prune_logs(Duration::from_secs(30 * 86400)).unwrap();

        assert_eq!(stats.logs_pruned, 1);
        assert_eq!(stats.logs_kept, 1);
        let remaining = store.recent_logs(1, 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].link, "fresh");
        assert!(store.last_prune().unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users");
        {
            let store = FjallUserStore::open(&path, 100).unwrap();
            store.ensure_user(&profile(11)).unwrap();
            store.record_delivery(11, history("kept")).unwrap();
            store.persist().unwrap();
        }

        let store = FjallUserStore::open(&path, 100).unwrap();
        let record = store.get_user(11).unwrap().unwrap();
        assert_eq!(record.links_processed, 1);
        assert_eq!(store.user_count().unwrap(), 1);
    }
}
