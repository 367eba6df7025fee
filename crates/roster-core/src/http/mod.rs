//! HTTP pipeline for the Roster backend
//!
//! This module provides:
//! - Bearer authentication through a pluggable token provider
//! - Retry of transport failures on a fixed backoff schedule
//! - Escalation of rejected credentials to an interactive login
//! - Normalization of error payloads into one record shape

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod request;
pub mod retry;

pub use auth::{AuthError, StaticTokenProvider, TokenProvider};
pub use client::{ApiClient, ME_PATH};
pub use config::{ClientConfig, BACKEND_URL_ENV, DEFAULT_BACKEND_URL};
pub use error::{FailureKind, RequestFailure, REAUTH_ERROR_CODES};
pub use normalizer::{normalize, ErrorRecord, DEFAULT_ERROR_MESSAGE};
pub use request::{ApiResponse, RequestOptions, ResponseBody};
pub use retry::{ReauthPolicy, RetryBudget, RetryPolicy};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
