use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::ApiError;
use crate::config::{ClientConfig, Credentials};

const TOKEN_PATH: &str = "/v1/oauth/token";
/// Refresh a cached token this long before the server says it expires.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// MetaNetworks API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    config: ClientConfig,
    token: RwLock<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() + TOKEN_EXPIRY_SLACK < at)
            .unwrap_or(true)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl Client {
    /// Create a new API client with default transport settings
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_config(endpoint, credentials, ClientConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        let http_client = config.build_http_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                credentials,
                config,
                token: RwLock::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Metaport operations
    pub fn metaports(&self) -> super::metaports::MetaportsApi<'_> {
        super::metaports::MetaportsApi::new(self)
    }

    /// Metaport cluster operations
    pub fn metaport_clusters(&self) -> super::metaport_clusters::MetaportClustersApi<'_> {
        super::metaport_clusters::MetaportClustersApi::new(self)
    }

    /// Routing group operations
    pub fn routing_groups(&self) -> super::routing_groups::RoutingGroupsApi<'_> {
        super::routing_groups::RoutingGroupsApi::new(self)
    }

    /// GET `path` and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.execute_with_retry(Method::GET, path, None).await?;
        parse_body(&text)
    }

    /// POST `body` to `path` (create)
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        let text = self
            .execute_with_retry(Method::POST, path, Some(&body))
            .await?;
        parse_body(&text)
    }

    /// PATCH `body` to `path` (full-object update)
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        let text = self
            .execute_with_retry(Method::PATCH, path, Some(&body))
            .await?;
        parse_body(&text)
    }

    /// DELETE `path`; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_with_retry(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.inner.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.inner.token.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}{}", self.inner.base_url, TOKEN_PATH);
        let scope = format!("org:{}", self.inner.credentials.org);
        tracing::debug!("Requesting access token for {}", scope);

        let response = self
            .inner
            .http_client
            .post(&url)
            .basic_auth(
                &self.inner.credentials.api_key,
                Some(&self.inner.credentials.api_secret),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", &scope)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!("Token request returned HTTP {}", status);
            return Err(ApiError::ServiceUnavailable);
        }
        if !status.is_success() {
            tracing::error!("Token request failed with HTTP {}", status);
            return Err(ApiError::AuthError);
        }

        let text = response.text().await?;
        let token: TokenResponse = parse_body(&text)?;
        let value = token.access_token.clone();
        *slot = Some(AccessToken {
            value: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        });

        Ok(value)
    }

    async fn forget_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Timeouts and connection failures become retryable errors.
    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.inner.config.request_timeout.as_secs())
        } else if e.is_connect() || e.is_request() {
            ApiError::ServiceUnavailable
        } else {
            ApiError::RequestError(e)
        }
    }

    /// Execute request with retry on transient transport failures
    async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let config = &self.inner.config;
        let url = format!("{}{}", self.inner.base_url, path);
        let mut attempt = 0;
        let mut last_error = None;
        let mut reauthenticated = false;

        while attempt <= config.max_retries {
            if attempt > 0 {
                let backoff = config.backoff(attempt);
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    path,
                    backoff.as_millis(),
                    attempt
                );
                tokio::time::sleep(backoff).await;
            }

            let token = match self.access_token().await {
                Ok(token) => token,
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!("{} request to: {}", method, url);

            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bearer {}", token));
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        return Ok(text);
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        self.forget_token().await;
                        if reauthenticated {
                            return Err(ApiError::AuthError);
                        }
                        tracing::debug!("{} {} returned 401, requesting a new token", method, path);
                        reauthenticated = true;
                        continue;
                    }

                    let error = ApiError::from_response(status.as_u16(), path, text);
                    match error {
                        ApiError::RateLimited => last_error = Some(error),
                        ApiError::ApiError { status, .. } if status >= 500 => {
                            tracing::warn!("{} {} returned HTTP {}", method, path, status);
                            last_error = Some(ApiError::ServiceUnavailable);
                        }
                        _ => return Err(error),
                    }
                }
                Err(e) => match self.transport_error(e) {
                    ApiError::RequestError(e) => return Err(ApiError::RequestError(e)),
                    error => last_error = Some(error),
                },
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::ParseError(format!("Failed to encode request body: {}", e)))
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}
