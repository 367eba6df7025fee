//! Roster Core - authenticated request pipeline for the Roster backend
//!
//! # Main Components
//!
//! - **Request Pipeline**: [`ApiClient`] attaches bearer credentials, retries
//!   transport failures and escalates rejected credentials to a login
//! - **Error Normalizer**: [`normalize`] turns any failed-response payload into
//!   an [`ErrorRecord`]
//! - **Debug Recorder**: [`DebugRecorder`] keeps a redacted trace of the last
//!   request/response pair and notifies observers
//!
//! # Example
//!
//! ```no_run
//! use roster_core::{ApiClient, ClientConfig, DebugRecorder, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let recorder = DebugRecorder::new();
//!     let client = ApiClient::new(
//!         ClientConfig::default(),
//!         Arc::new(StaticTokenProvider::from_env("ROSTER_ACCESS_TOKEN")),
//!         recorder.clone(),
//!     )?;
//!     let me = client.me().await?;
//!     println!("{me}");
//!     Ok(())
//! }
//! ```

pub mod debug;
pub mod error;
pub mod http;

pub use debug::{DebugRecorder, DebugSnapshot, RequestTrace, ResponseTrace, Subscription};
pub use error::{Error, Result};
pub use http::{
    normalize, ApiClient, ApiResponse, AuthError, ClientConfig, ErrorRecord, FailureKind,
    ReauthPolicy, RequestFailure, RequestOptions, ResponseBody, RetryPolicy,
    StaticTokenProvider, TokenProvider, REAUTH_ERROR_CODES,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
