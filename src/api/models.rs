//! Response bodies of the HTTP control surface

use serde::Serialize;

use crate::observability::MetricsSnapshot;

pub const SERVICE_NAME: &str = "teradrop";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            service: Some(SERVICE_NAME),
        }
    }

    pub fn initializing() -> Self {
        Self {
            status: "initializing",
            service: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

/// `{"ok":false,"error":...}` for webhook failures, `{"error":...}` for
/// unknown routes
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Vec<&'static str>,
    pub metrics: MetricsSnapshot,
}
