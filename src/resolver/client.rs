//! HTTP client for the share-link resolver API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::error::{AttemptError, ResolveError};
use super::models::{FileDescriptor, ResolverResponse};
use super::LinkResolver;
use crate::config::ResolverConfig;
use crate::retry::{RetryError, RetryPolicy};

/// Long-lived resolver client; cheap to share behind an `Arc`
#[derive(Debug, Clone)]
pub struct ResolverClient {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl ResolverClient {
    /// Build a client from config; backoff is `2^attempt` seconds
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let policy = RetryPolicy::exponential(config.max_retries, Duration::from_secs(1));
        Self::with_policy(config, policy)
    }

    /// Build a client with an explicit retry policy
    pub fn with_policy(config: &ResolverConfig, policy: RetryPolicy) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("teradrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolveError::Client(e.to_string()))?;

        info!(endpoint = %config.endpoint, max_attempts = policy.max_attempts(), "resolver client initialized");

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            policy,
        })
    }

    /// Issue one request and classify the outcome
    async fn request_once(&self, link: &str, attempt: u32) -> Result<ResolverResponse, AttemptError> {
        debug!(link, attempt = attempt + 1, "querying resolver");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", link)])
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(AttemptError::RateLimited),
            other => return Err(AttemptError::Status(other.as_u16())),
        }

        let body = response.bytes().await.map_err(AttemptError::from_reqwest)?;
        let payload: ResolverResponse = serde_json::from_slice(&body)
            .map_err(|e| AttemptError::Malformed(e.to_string()))?;

        if !payload.is_accepted() {
            return Err(AttemptError::Rejected {
                status: payload.status_text().to_string(),
                has_link: payload
                    .download_link
                    .as_deref()
                    .is_some_and(|l| !l.is_empty()),
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl LinkResolver for ResolverClient {
    #[instrument(skip(self))]
    async fn resolve(&self, link: &str) -> Result<FileDescriptor, ResolveError> {
        let payload = self
            .policy
            .run(|attempt| self.request_once(link, attempt), AttemptError::is_retryable)
            .await
            .map_err(|err| match err {
                RetryError::Permanent(e) => {
                    warn!(link, error = %e, "resolver rejected link");
                    ResolveError::from(e)
                }
                RetryError::Exhausted { attempts, last } => ResolveError::Exhausted {
                    attempts,
                    last_error: last.to_string(),
                },
            })?;

        let descriptor = payload.into_descriptor();
        if descriptor.download_url.is_empty() {
            warn!(link, file_name = %descriptor.file_name, "resolver returned no download URL");
            return Err(ResolveError::MissingDownloadUrl);
        }

        debug!(link, file_name = %descriptor.file_name, size = descriptor.size_bytes, "link resolved");
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LINK: &str = "https://terabox.com/s/abc123";

    fn client_for(server: &MockServer, max_retries: u32) -> ResolverClient {
        let config = ResolverConfig {
            endpoint: format!("{}/api", server.uri()),
            timeout_secs: 5,
            max_retries,
        };
        ResolverClient::with_policy(&config, RetryPolicy::exponential(max_retries, Duration::ZERO))
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_success_keeps_download_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("url", LINK))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "✅ Successfully",
                "file_name": "clip.mp4",
                "file_size": "1.00 MB",
                "size_bytes": 1048576,
                "download_link": "https://cdn.example/clip.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = client_for(&server, 3).resolve(LINK).await.unwrap();
        assert_eq!(descriptor.download_url, "https://cdn.example/clip.mp4");
        assert_eq!(descriptor.file_name, "clip.mp4");
        assert_eq!(descriptor.size_bytes, 1048576);
    }

    #[tokio::test]
    async fn test_success_without_link_or_server_name_is_rejected_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Successfully",
                "download_link": "",
                "file_name": "x"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_server_filename_without_link_is_missing_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Successfully",
                "server_filename": "only-name.bin"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::MissingDownloadUrl)));
    }

    #[tokio::test]
    async fn test_rate_limit_retries_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Exhausted { attempts: 3, .. })));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "download_link": "https://cdn.example/f"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = client_for(&server, 3).resolve(LINK).await.unwrap();
        assert_eq!(descriptor.download_url, "https://cdn.example/f");
        assert_eq!(descriptor.file_name, "unknown");
    }

    #[tokio::test]
    async fn test_malformed_body_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_definitive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Rejected(ref m)) if m.contains("502")));
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .expect(2)
            .mount(&server)
            .await;

        let config = ResolverConfig {
            endpoint: format!("{}/api", server.uri()),
            timeout_secs: 1,
            max_retries: 2,
        };
        let client =
            ResolverClient::with_policy(&config, RetryPolicy::exponential(2, Duration::ZERO)).unwrap();

        let result = client.resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Exhausted { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_exhausts() {
        let config = ResolverConfig {
            endpoint: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 2,
            max_retries: 2,
        };
        let client =
            ResolverClient::with_policy(&config, RetryPolicy::exponential(2, Duration::ZERO)).unwrap();

        let result = client.resolve(LINK).await;
        assert!(matches!(result, Err(ResolveError::Exhausted { attempts: 2, .. })));
    }
}
