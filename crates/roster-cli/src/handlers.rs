//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod config;
mod request;

pub use completions::handle_completions;
pub use config::handle_config;
pub use request::{handle_me, handle_request};

use crate::auth::build_token_provider;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use roster_core::{ApiClient, DebugRecorder, RequestFailure, Subscription};

/// Global flags that shape the backend client
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions<'a> {
    pub base_url: Option<&'a str>,
    pub token: Option<&'a str>,
    pub debug: bool,
}

/// A configured client plus the optional `--debug` observer
pub struct Session {
    client: ApiClient,
    observer: Option<Subscription>,
}

impl Session {
    /// Build the client for one invocation
    pub fn open(options: SessionOptions<'_>, config: &Config) -> Result<Self> {
        let provider = build_token_provider(options.token, &config.auth)?;
        let recorder = DebugRecorder::new();

        let observer = options.debug.then(|| {
            recorder.subscribe(|snapshot| match (&snapshot.request, &snapshot.response) {
                (Some(request), None) => {
                    tracing::info!(url = %request.url, method = %request.method, "request sent");
                }
                (Some(request), Some(response)) => {
                    tracing::info!(url = %request.url, status = response.status, "response received");
                }
                _ => {}
            })
        });
        tracing::debug!(observers = recorder.observer_count(), "debug recorder ready");

        let client = ApiClient::new(config.client_config(options.base_url), provider, recorder)?;
        Ok(Self { client, observer })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Close the session around a call's outcome
    ///
    /// With `--debug` the last request/response trace is printed whether
    /// or not the call succeeded.
    pub fn conclude<T>(
        self,
        output: &mut OutputWriter,
        outcome: std::result::Result<T, RequestFailure>,
    ) -> Result<T> {
        if let Some(observer) = self.observer {
            observer.unsubscribe();
            output.section("Debug")?;
            output.snapshot(&self.client.recorder().read())?;
        }
        Ok(outcome?)
    }
}
