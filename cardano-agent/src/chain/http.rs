//! HTTP plumbing shared by the REST providers.

use std::sync::Arc;

use reqwest::RequestBuilder;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ProviderConfig, RetryConfig};
use crate::error::{Error, ProviderError, Result};

/// Base URL, auth headers, and retry policy for one provider.
#[derive(Clone)]
pub(crate) struct HttpTransport {
    provider: &'static str,
    client: reqwest::Client,
    base_url: Arc<str>,
    headers: HeaderMap,
    retry: RetryConfig,
}

impl HttpTransport {
    /// Build a transport from provider configuration.
    pub(crate) fn new(
        provider: &'static str,
        config: &ProviderConfig,
        default_base_url: &str,
        auth_header: &'static str,
        auth_value: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::with_capacity(1);
        let value = HeaderValue::from_str(auth_value)
            .map_err(|e| Error::configuration(format!("invalid {provider} api key: {e}")))?;
        headers.insert(auth_header, value);

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(default_base_url)
            .trim_end_matches('/');

        Ok(Self {
            provider,
            client: config.http.build_client()?,
            base_url: Arc::from(base_url),
            headers,
            retry: config.retry,
        })
    }

    /// Get the base URL for API requests.
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a JSON document.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = self.url(path);
        let response = self
            .send(|| self.client.get(&url), self.retry.max_attempts)
            .await?;
        self.decode(response).await
    }

    /// GET a JSON document, mapping HTTP 404 to `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ProviderError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST a JSON body and decode the JSON response.
    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .send(
                || self.client.post(&url).json(body),
                self.retry.max_attempts,
            )
            .await?;
        self.decode(response).await
    }

    /// POST raw CBOR bytes and return the response body as text.
    ///
    /// Sent exactly once. A submission that timed out may still have reached
    /// the node, and resending it would be rejected for spent inputs.
    pub(crate) async fn post_cbor(
        &self,
        path: &str,
        bytes: &[u8],
    ) -> Result<String, ProviderError> {
        let url = self.url(path);
        let response = self
            .send(
                || {
                    self.client
                        .post(&url)
                        .header(CONTENT_TYPE, HeaderValue::from_static("application/cbor"))
                        .body(bytes.to_vec())
                },
                1,
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| ProviderError::from(e).with_provider(self.provider))
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from(e).with_provider(self.provider))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::from(e).with_provider(self.provider))
    }

    /// Send a request, retrying retryable failures up to `max_attempts`
    /// with the policy's backoff.
    async fn send(
        &self,
        request: impl Fn() -> RequestBuilder,
        max_attempts: u32,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            let err = match request().headers(self.headers.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    ProviderError::http_status(status, body)
                }
                Err(e) => ProviderError::from(e),
            }
            .with_provider(self.provider);

            attempt += 1;
            if !err.is_retryable() || attempt >= max_attempts {
                debug!(provider = self.provider, attempt, error = %err, "provider request failed");
                return Err(err);
            }

            let delay = self.retry.delay_for_attempt(attempt - 1);
            warn!(
                provider = self.provider,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retrying provider request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Parse a submit endpoint response: a JSON string or a bare hash.
pub(crate) fn parse_submitted_hash(body: &str) -> Result<String, ProviderError> {
    let hash = serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_owned());
    if hash.is_empty() {
        return Err(ProviderError::decode(
            "submit response did not contain a hash",
        ));
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submitted_hash() {
        assert_eq!(parse_submitted_hash("\"abc123\"").unwrap(), "abc123");
        assert_eq!(parse_submitted_hash("abc123\n").unwrap(), "abc123");
        assert!(parse_submitted_hash("  ").is_err());
    }
}
