//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("audiobook-client/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Automatic retry with exponential backoff on connection failures,
///   timeouts, `429` and `5xx`
/// - TLS via rustls
///
/// A retryable status that survives every attempt is returned as a normal
/// response so callers can apply their own fallback.
pub struct ReqwestHttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with a default per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Retry policy used by [`HttpClient::execute`]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 429
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Execute request with retry logic
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < max_attempts {
            attempt += 1;
            let last_attempt = attempt == max_attempts;
            debug!(
                attempt,
                max_attempts,
                method = ?request.method,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.build_request(&request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !Self::is_retryable_status(status) || last_attempt {
                        return Self::into_response(response).await;
                    }
                    warn!(status, attempt, "HTTP request failed with retryable status");
                    last_error = Some(BridgeError::OperationFailed(format!("HTTP {status}")));
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    last_error = Some(if e.is_timeout() {
                        BridgeError::OperationFailed("Request timed out".to_string())
                    } else if e.is_connect() {
                        BridgeError::OperationFailed(format!("Connection failed: {e}"))
                    } else {
                        BridgeError::OperationFailed(e.to_string())
                    });
                }
            }

            if !last_attempt {
                let delay = policy.delay_for_attempt(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, self.policy.clone()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}
