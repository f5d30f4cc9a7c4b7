//! Key layout for the user store partitions
//!
//! - `users`: user:{user_id} -> UserRecord (JSON)
//! - `logs`: log:{user_id}:{timestamp_ms:020} -> ActivityLog (JSON)
//! - `metadata`: meta:{key} -> value (string)

pub fn encode_user_key(user_id: i64) -> Vec<u8> {
    format!("user:{}", user_id).into_bytes()
}

pub fn encode_log_key(user_id: i64, timestamp_ms: u64) -> Vec<u8> {
    format!("log:{}:{:020}", user_id, timestamp_ms).into_bytes()
}

/// Prefix for scanning one user's log entries: log:{user_id}:
pub fn encode_log_prefix(user_id: i64) -> Vec<u8> {
    format!("log:{}:", user_id).into_bytes()
}

/// Decode log:{user_id}:{timestamp_ms} -> (user_id, timestamp_ms)
pub fn decode_log_key(key: &[u8]) -> Option<(i64, u64)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (user, ts) = key_str.strip_prefix("log:")?.split_once(':')?;
    Some((user.parse().ok()?, ts.parse().ok()?))
}

pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
