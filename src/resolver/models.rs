use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder name when the resolver reports neither filename field
pub const UNKNOWN_FILE_NAME: &str = "unknown";

/// Normalized metadata about a resolved remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub file_name: String,
    /// Size as the resolver displays it, e.g. "12.4 MB"
    pub displayed_size: String,
    pub size_bytes: u64,
    pub download_url: String,
    pub thumbnail_url: Option<String>,
    pub proxy_url: Option<String>,
}

/// Raw resolver payload. Every field is optional; the API is undocumented
/// and omits keys freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub server_filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub download_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub proxy_url: Option<String>,
}

impl ResolverResponse {
    /// The resolver signals success through free text ("Successfully",
    /// "✅ Successfully", ...). Matching is a loose substring check because
    /// that is the only contract the service offers.
    pub fn reports_success(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.trim().to_lowercase().contains("success"))
            .unwrap_or(false)
    }

    /// Success status plus at least a direct link or a server-side filename
    pub fn is_accepted(&self) -> bool {
        let has_link = non_empty(&self.download_link).is_some();
        let has_server_name = non_empty(&self.server_filename).is_some();
        self.reports_success() && (has_link || has_server_name)
    }

    pub fn status_text(&self) -> &str {
        self.status.as_deref().unwrap_or("<no status>")
    }

    /// Apply field fallbacks. Missing optional fields never fail here.
    pub fn into_descriptor(self) -> FileDescriptor {
        let file_name = non_empty(&self.file_name)
            .or_else(|| non_empty(&self.server_filename))
            .unwrap_or(UNKNOWN_FILE_NAME)
            .to_string();

        FileDescriptor {
            file_name,
            displayed_size: non_empty(&self.file_size).unwrap_or("0 B").to_string(),
            size_bytes: self.size_bytes.unwrap_or(0),
            download_url: self.download_link.unwrap_or_default(),
            thumbnail_url: self.thumbnail.filter(|t| !t.is_empty()),
            proxy_url: self.proxy_url.filter(|p| !p.is_empty()),
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accept strings, numbers, or null for text fields
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept integers, floats, numeric strings; anything else becomes None
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
