//! HTTP implementation of the remote sync client.
//!
//! Speaks the device REST API as JSON. Transient failures (connection
//! errors, HTTP 5xx, 429) are retried under the supplied policy with
//! exponential backoff; everything else is terminal.

use super::RemoteSyncApi;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sync_core::RetryPolicy;
use sync_types::{ApiError, Device, DeviceId, Interest, InterestSet, Metadata, Token, UserId};

/// Configuration for [`HttpApi`].
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Base URL of the service, without a trailing slash.
    pub base_url: String,
    /// The service instance this device belongs to.
    pub instance_id: String,
}

impl HttpApiConfig {
    /// Create a configuration; a trailing slash on `base_url` is trimmed.
    pub fn new(base_url: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            instance_id: instance_id.into(),
        }
    }
}

/// Reqwest-backed client for the device REST API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    config: HttpApiConfig,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    token: &'a str,
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: String,
    #[serde(default)]
    initial_interests: Vec<String>,
}

#[derive(Serialize)]
struct InterestsRequest<'a> {
    interests: Vec<&'a str>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct UserIdRequest<'a> {
    user_id: &'a str,
}

impl HttpApi {
    /// Create a client with a default reqwest connection pool.
    pub fn new(config: HttpApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn devices_url(&self, path: &str) -> String {
        format!(
            "{}/instances/{}/devices{}",
            self.config.base_url, self.config.instance_id, path
        )
    }

    /// Send a request, retrying transient failures under `retry`.
    ///
    /// `build` constructs a fresh request for each attempt. Terminal
    /// outcomes: 2xx (success), 404 (`DeviceNotFound`), any other non-5xx
    /// status (`Request`), or a bounded policy running out of attempts.
    async fn send_with_retry<F>(
        &self,
        retry: &RetryPolicy,
        mut build: F,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder + Send,
    {
        let mut attempt: u32 = 0;
        loop {
            let last_error = match build(&self.http).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(ApiError::DeviceNotFound);
                    }
                    if !status.is_server_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ApiError::Request(format!("{status}: {body}")));
                    }
                    format!("transient status {status}")
                }
                Err(error) => error.to_string(),
            };

            attempt = attempt.saturating_add(1);
            if retry.is_exhausted(attempt) {
                return Err(ApiError::Request(format!("retries exhausted: {last_error}")));
            }
            tracing::debug!(attempt, error = %last_error, "remote call failed, backing off");
            tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
        }
    }
}

#[async_trait]
impl RemoteSyncApi for HttpApi {
    async fn register(
        &self,
        token: &Token,
        metadata: &Metadata,
        retry: &RetryPolicy,
    ) -> Result<Device, ApiError> {
        let url = self.devices_url("");
        let body = RegisterRequest {
            token: token.expose(),
            metadata,
        };
        let response = self
            .send_with_retry(retry, |http| http.post(url.as_str()).json(&body))
            .await?;
        let parsed: RegisterResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Request(format!("invalid registration response: {e}")))?;

        // The server owns interest validation; drop anything it sent that
        // we cannot represent rather than failing the registration.
        let initial_interests: InterestSet = parsed
            .initial_interests
            .into_iter()
            .filter_map(|name| Interest::new(name).ok())
            .collect();
        Ok(Device::new(DeviceId::new(parsed.id), initial_interests))
    }

    async fn subscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/interests/{interest}"));
        self.send_with_retry(retry, |http| http.post(url.as_str()))
            .await
            .map(drop)
    }

    async fn unsubscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/interests/{interest}"));
        self.send_with_retry(retry, |http| http.delete(url.as_str()))
            .await
            .map(drop)
    }

    async fn set_subscriptions(
        &self,
        device_id: &DeviceId,
        interests: &InterestSet,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/interests"));
        let body = InterestsRequest {
            interests: interests.iter().map(Interest::as_str).collect(),
        };
        self.send_with_retry(retry, |http| http.put(url.as_str()).json(&body))
            .await
            .map(drop)
    }

    async fn delete_device(
        &self,
        device_id: &DeviceId,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}"));
        self.send_with_retry(retry, |http| http.delete(url.as_str()))
            .await
            .map(drop)
    }

    async fn refresh_token(
        &self,
        device_id: &DeviceId,
        token: &Token,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/token"));
        let body = TokenRequest {
            token: token.expose(),
        };
        self.send_with_retry(retry, |http| http.put(url.as_str()).json(&body))
            .await
            .map(drop)
    }

    async fn set_user_id(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/user"));
        let body = UserIdRequest {
            user_id: user_id.as_str(),
        };
        self.send_with_retry(retry, |http| http.put(url.as_str()).json(&body))
            .await
            .map(drop)
    }

    async fn set_metadata(
        &self,
        device_id: &DeviceId,
        metadata: &Metadata,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let url = self.devices_url(&format!("/{device_id}/metadata"));
        self.send_with_retry(retry, |http| http.put(url.as_str()).json(metadata))
            .await
            .map(drop)
    }
}
