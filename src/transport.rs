use crate::config::Config;
use crate::errors::AppError;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP status codes worth one more attempt.
const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Shared HTTP transport: one pooled `reqwest::Client` with a default
/// per-request timeout and bounded retry with exponential backoff on
/// 429/500/502/503/504.
///
/// A non-success status after retries are exhausted surfaces as
/// `AppError::ExternalApiError`, so callers never have to re-check the
/// status themselves.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpTransport {
    /// Builds the process-wide client. The permit portal serves a
    /// certificate the default trust store rejects, so verification is
    /// disabled the same way the portal's own docs instruct.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    /// GET a URL (query string already encoded into it).
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, AppError> {
        self.execute(self.client.get(url)).await
    }

    /// POST a form-encoded body, with optional extra headers (the permit
    /// portal needs an explicit session cookie and host header).
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<reqwest::Response, AppError> {
        let mut request = self.client.post(url).form(form);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        self.execute(request).await
    }

    /// Sends a request, retrying transport failures and retryable statuses
    /// up to `max_retries` extra times.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let mut attempt = 0u32;
        loop {
            let builder = request.try_clone().ok_or_else(|| {
                AppError::InternalError("Request body is not cloneable".to_string())
            })?;

            let outcome = builder.send().await;
            let retryable = match &outcome {
                Ok(response) => RETRY_STATUSES.contains(&response.status()),
                Err(_) => true,
            };

            if retryable && attempt < self.max_retries {
                let delay = BACKOFF_BASE * 2u32.pow(attempt);
                tracing::warn!(
                    "Request attempt {} failed, retrying in {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let response = outcome
                .map_err(|e| AppError::ExternalApiError(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(AppError::ExternalApiError(format!(
                    "Server returned status {}",
                    response.status()
                )));
            }
            return Ok(response);
        }
    }
}
