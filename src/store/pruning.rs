//! Activity-log retention

use std::time::Duration;

use chrono::Utc;
use fjall::PartitionHandle;
use tracing::{debug, info};

use super::error::Result;
use super::partitions::{decode_log_key, encode_meta_key};

const META_LAST_PRUNE_LOGS: &str = "last_prune_logs";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub logs_pruned: usize,
    pub logs_kept: usize,
}

/// Remove log entries whose key timestamp is older than `ttl`
pub fn prune_logs(
    logs_partition: &PartitionHandle,
    metadata_partition: &PartitionHandle,
    ttl: Duration,
) -> Result<PruneStats> {
    let now_ms = Utc::now().timestamp_millis().max(0) as u64;
    let cutoff_ms = now_ms.saturating_sub(ttl.as_millis().min(u64::MAX as u128) as u64);

    let mut expired = Vec::new();
    let mut stats = PruneStats::default();

    for item in logs_partition.iter() {
        let (key, _) = item?;
        match decode_log_key(&key) {
            Some((_, ts)) if ts < cutoff_ms => expired.push(key),
            Some(_) => stats.logs_kept += 1,
            None => debug!(key = %String::from_utf8_lossy(&key), "skipping undecodable log key"),
        }
    }

    for key in expired {
        logs_partition.remove(key)?;
        stats.logs_pruned += 1;
    }

    metadata_partition.insert(
        encode_meta_key(META_LAST_PRUNE_LOGS),
        now_ms.to_string().as_bytes(),
    )?;

    info!(pruned = stats.logs_pruned, kept = stats.logs_kept, cutoff_ms, "pruned activity logs");
    Ok(stats)
}

/// Millisecond timestamp of the last prune run, if any
pub fn last_prune(metadata_partition: &PartitionHandle) -> Result<Option<u64>> {
    Ok(metadata_partition
        .get(encode_meta_key(META_LAST_PRUNE_LOGS))?
        .and_then(|raw| std::str::from_utf8(&raw).ok()?.parse().ok()))
}
