use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resolver::FileDescriptor;

/// Identity of a chat user as seen on an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Snapshot of one delivered file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub file_name: String,
    pub displayed_size: String,
    pub size_bytes: u64,
    pub download_url: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_descriptor(descriptor: &FileDescriptor, timestamp: DateTime<Utc>) -> Self {
        Self {
            file_name: descriptor.file_name.clone(),
            displayed_size: descriptor.displayed_size.clone(),
            size_bytes: descriptor.size_bytes,
            download_url: descriptor.download_url.clone(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub first_seen: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub links_processed: u64,
    #[serde(default)]
    pub download_history: Vec<HistoryEntry>,
}

impl UserRecord {
    pub fn new(profile: &UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            user_id: profile.user_id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            first_seen: now,
            last_active: now,
            total_requests: 0,
            links_processed: 0,
            download_history: Vec::new(),
        }
    }

    /// Count one delivery and append to history, dropping the oldest entries
    /// beyond `history_limit` (0 keeps everything)
    pub fn apply_delivery(&mut self, entry: HistoryEntry, history_limit: usize) {
        self.total_requests += 1;
        self.links_processed += 1;
        self.last_active = entry.timestamp;
        self.download_history.push(entry);

        if history_limit > 0 && self.download_history.len() > history_limit {
            let excess = self.download_history.len() - history_limit;
            self.download_history.drain(..excess);
        }
    }

    pub fn stats(&self) -> UserStats {
        UserStats {
            total_requests: self.total_requests,
            links_processed: self.links_processed,
            first_seen: self.first_seen,
            last_active: self.last_active,
            downloaded_count: self.download_history.len(),
            downloaded_bytes: self.download_history.iter().map(|e| e.size_bytes).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_requests: u64,
    pub links_processed: u64,
    pub first_seen: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub downloaded_count: usize,
    pub downloaded_bytes: u64,
}

/// How one link in a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Delivered,
    ResolveFailed,
    DownloadFailed,
    DeliveryFailed,
}

impl LinkOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, LinkOutcome::Delivered)
    }
}

/// Per-link activity entry kept in the `logs` partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub user_id: i64,
    pub link: String,
    pub outcome: LinkOutcome,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}
