//! Remote position store
//!
//! The server is authoritative: a push sends the device's full record set
//! for one book and receives the canonical set back.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_library::models::PositionRecord;
use core_runtime::config::ApiEndpoints;
use std::sync::Arc;
use tracing::{debug, instrument};

#[async_trait]
pub trait PositionRemote: Send + Sync {
    /// Push `records` for `book` and return the canonical set.
    ///
    /// An empty result means the server has nothing to report.
    ///
    /// # Errors
    ///
    /// Network failures, non-success statuses and malformed payloads.
    async fn push(&self, book: &str, records: &[PositionRecord]) -> Result<Vec<PositionRecord>>;
}

/// `PATCH /v1/books/{id}/positions` over the host HTTP client.
pub struct HttpPositionRemote {
    http: Arc<dyn HttpClient>,
    endpoints: ApiEndpoints,
}

impl HttpPositionRemote {
    pub fn new(http: Arc<dyn HttpClient>, endpoints: ApiEndpoints) -> Self {
        Self { http, endpoints }
    }
}

#[async_trait]
impl PositionRemote for HttpPositionRemote {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn push(&self, book: &str, records: &[PositionRecord]) -> Result<Vec<PositionRecord>> {
        let url = self.endpoints.positions(book);
        let request = HttpRequest::new(HttpMethod::Patch, url.clone())
            .header("Accept", "application/json")
            .json(records)?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(SyncError::Remote {
                status: response.status,
                url,
            });
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            debug!("Empty position payload");
            return Ok(Vec::new());
        }

        let payload: serde_json::Value =
            serde_json::from_slice(&response.body).map_err(|e| SyncError::Malformed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        match payload {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value::<PositionRecord>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SyncError::Malformed {
                    url,
                    message: e.to_string(),
                }),
            other => Err(SyncError::Malformed {
                url,
                message: format!("expected an array, got {}", json_kind(&other)),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn remote(http: MockHttp) -> HttpPositionRemote {
        HttpPositionRemote::new(Arc::new(http), ApiEndpoints::new("https://books.example"))
    }

    #[tokio::test]
    async fn test_push_sends_patch_with_wire_records() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                let body: serde_json::Value =
                    serde_json::from_slice(request.body.as_deref().unwrap_or_default()).unwrap();
                request.method == HttpMethod::Patch
                    && request.url == "https://books.example/v1/books/dune.m4b/positions"
                    && body[0]["position"] == 12.5
                    && body[0].get("local_id").is_none()
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"[{"id":3,"book":"dune.m4b","position":12.5,"timestamp":1000,"client_id":"c1"}]"#,
                ))
            });

        let record = PositionRecord::new("dune.m4b", 12.5, 1000);
        let canonical = remote(http).push("dune.m4b", &[record]).await.unwrap();
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].sync_id, Some(3));
        assert_eq!(canonical[0].local_id, None);
        assert_eq!(canonical[0].client_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_non_success_is_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(502, "bad gateway")));
        let err = remote(http).push("a", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { status: 502, .. }));
        assert!(err.is_network_error());
    }

    #[tokio::test]
    async fn test_non_array_payload_is_malformed() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"error":"nope"}"#)));
        let err = remote(http).push("a", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_empty_and_null_payloads_mean_no_update() {
        for body in ["", "  ", "null", "[]"] {
            let mut http = MockHttp::new();
            http.expect_execute()
                .returning(move |_| Ok(HttpResponse::new(200, body)));
            assert!(remote(http).push("a", &[]).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("offline".into())));
        let err = remote(http).push("a", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Bridge(_)));
    }
}
