//! Authenticated, retrying API client
//!
//! One logical call runs through a small state machine:
//!
//! ```text
//! Attempting ──ok──────────────────────────────▶ Done
//!     │ transport failure, budget left ─▶ BackingOff ─▶ Attempting
//!     │ login required ─────────────────▶ Escalating ─▶ Failed (or Attempting once)
//!     └ anything else ──────────────────────────────▶ Failed
//! ```
//!
//! Every attempt writes a pre-flight and, once a response arrives, a
//! post-flight [`DebugSnapshot`] to the shared [`DebugRecorder`].

use crate::debug::{DebugRecorder, DebugSnapshot, RequestTrace, ResponseTrace};
use crate::error::{Error, Result};
use crate::http::auth::TokenProvider;
use crate::http::config::ClientConfig;
use crate::http::error::RequestFailure;
use crate::http::normalizer::{normalize, ErrorRecord};
use crate::http::request::{ApiResponse, RequestOptions, ResponseBody};
use crate::http::retry::{ReauthPolicy, RetryBudget};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Profile endpoint of the backend
pub const ME_PATH: &str = "/api/me";

enum CallState {
    Attempting,
    BackingOff(Duration),
    Escalating(RequestFailure),
    Done(ApiResponse),
    Failed(RequestFailure),
}

/// Client for the Roster backend
pub struct ApiClient {
    /// Underlying reqwest client
    client: ReqwestClient,
    /// Supplies bearer tokens and the login trigger
    token_provider: Arc<dyn TokenProvider>,
    /// Receives request/response traces
    recorder: Arc<DebugRecorder>,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new client
    ///
    /// Fails if the backend origin does not resolve to a valid http(s) URL or
    /// the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        token_provider: Arc<dyn TokenProvider>,
        recorder: Arc<DebugRecorder>,
    ) -> Result<Self> {
        config.resolve_base_url()?;

        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::HttpClient {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            token_provider,
            recorder,
            config,
        })
    }

    /// Create with default configuration
    pub fn with_default_config(
        token_provider: Arc<dyn TokenProvider>,
        recorder: Arc<DebugRecorder>,
    ) -> Result<Self> {
        Self::new(ClientConfig::default(), token_provider, recorder)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn recorder(&self) -> &Arc<DebugRecorder> {
        &self.recorder
    }

    /// Call `path` and decode the body into `T`
    ///
    /// A successful response whose body does not fit `T` is reported as an
    /// application failure carrying the response status.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> std::result::Result<T, RequestFailure> {
        let response = self.request_raw(path, options).await?;

        response.body.decode().map_err(|e| {
            RequestFailure::Application(ErrorRecord {
                raw: response.body.into_value(),
                ..ErrorRecord::from_message(
                    response.status,
                    format!("Failed to decode response: {}", e),
                )
            })
        })
    }

    /// `GET` helper
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, RequestFailure> {
        self.request(path, &RequestOptions::get()).await
    }

    /// Profile of the signed-in user
    pub async fn me(&self) -> std::result::Result<Value, RequestFailure> {
        let options = RequestOptions::get().header("Content-Type", "application/json");
        self.request(ME_PATH, &options).await
    }

    /// Call `path` and return the status and parsed body
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request_raw(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> std::result::Result<ApiResponse, RequestFailure> {
        let base_url = self
            .config
            .resolve_base_url()
            .map_err(|e| RequestFailure::Application(ErrorRecord::from_message(0, e.to_string())))?;
        let url = format!("{}{}", base_url, path);

        let mut budget = RetryBudget::new(&self.config.retry_policy);
        let mut escalated = false;
        let mut attempt: u32 = 0;
        let mut state = CallState::Attempting;

        loop {
            state = match state {
                CallState::Attempting => {
                    attempt += 1;
                    match self.attempt(&url, options, attempt).await {
                        Ok(response) => CallState::Done(response),
                        Err(failure) => next_state(failure, &mut budget, attempt),
                    }
                }
                CallState::BackingOff(delay) => {
                    tokio::time::sleep(delay).await;
                    CallState::Attempting
                }
                CallState::Escalating(failure) if escalated => CallState::Failed(failure),
                CallState::Escalating(failure) => {
                    escalated = true;
                    self.escalate(failure).await
                }
                CallState::Done(response) => {
                    debug!(url = %url, attempt, status = response.status, "Request succeeded");
                    return Ok(response);
                }
                CallState::Failed(failure) => {
                    error!(
                        url = %url,
                        attempt,
                        kind = %failure.kind(),
                        status = failure.status(),
                        "Request failed: {}",
                        failure
                    );
                    return Err(failure);
                }
            };
        }
    }

    /// One physical attempt
    async fn attempt(
        &self,
        url: &str,
        options: &RequestOptions,
        attempt: u32,
    ) -> std::result::Result<ApiResponse, RequestFailure> {
        let token = self
            .token_provider
            .access_token()
            .await
            .map_err(RequestFailure::Credential)?;

        let headers = authorized_headers(&options.headers, &token);
        let request_trace = RequestTrace::new(url, options.method.as_str(), &headers);
        self.recorder.write(DebugSnapshot::preflight(request_trace.clone()));

        let request = self.build_request(url, options, &headers)?;
        debug!(url = %url, attempt, "Sending request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(RequestFailure::Transport)?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(RequestFailure::Transport)?;

        let parsed = if is_json {
            serde_json::from_str::<Value>(&text).map(ResponseBody::Json)
        } else {
            Ok(ResponseBody::Text(text.clone()))
        };

        let snippet_source = match &parsed {
            Ok(body) => body.to_snippet_source(),
            Err(_) => text.clone(),
        };
        self.recorder.write(DebugSnapshot::completed(
            request_trace,
            ResponseTrace::new(status.as_u16(), &snippet_source),
        ));
        debug!(url = %url, attempt, status = status.as_u16(), "Received response");

        let body = parsed.map_err(|e| {
            RequestFailure::Application(ErrorRecord {
                raw: Value::String(text),
                ..ErrorRecord::from_message(status.as_u16(), format!("Malformed JSON response: {}", e))
            })
        })?;

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(RequestFailure::from_record(normalize(
                status.as_u16(),
                &body.into_value(),
            )))
        }
    }

    /// Trigger login and decide whether the call gets another attempt
    ///
    /// Only a backend rejection is ever retried. A token failure is returned
    /// as-is once login has been started.
    async fn escalate(&self, failure: RequestFailure) -> CallState {
        warn!(
            kind = %failure.kind(),
            status = failure.status(),
            "Login required, triggering login: {}",
            failure
        );
        let retryable = matches!(failure, RequestFailure::Auth { .. });

        match (self.token_provider.login().await, self.config.reauth_policy) {
            (Ok(()), ReauthPolicy::RetryOnce) if retryable => {
                debug!("Login completed, retrying once");
                CallState::Attempting
            }
            (Ok(()), _) => CallState::Failed(failure),
            (Err(login_error), _) => {
                warn!(error = %login_error, "Login did not complete");
                CallState::Failed(failure)
            }
        }
    }

    fn build_request(
        &self,
        url: &str,
        options: &RequestOptions,
        headers: &HashMap<String, String>,
    ) -> std::result::Result<reqwest::Request, RequestFailure> {
        let mut builder = self.client.request(options.method.clone(), url);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }

        builder.build().map_err(|e| {
            RequestFailure::Application(ErrorRecord::from_message(0, format!("Invalid request: {}", e)))
        })
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Route a failed attempt to the next state
fn next_state(failure: RequestFailure, budget: &mut RetryBudget, attempt: u32) -> CallState {
    if failure.requires_login() {
        return CallState::Escalating(failure);
    }
    if !failure.is_retryable() {
        return CallState::Failed(failure);
    }

    match budget.next_delay() {
        Some(delay) => {
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Transport failure, retrying: {}",
                failure
            );
            CallState::BackingOff(delay)
        }
        None => CallState::Failed(failure),
    }
}

/// Copy caller headers and set the bearer credential
///
/// Any caller-supplied Authorization header is dropped, whatever its case.
fn authorized_headers(caller: &HashMap<String, String>, token: &str) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = caller
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    headers
}
