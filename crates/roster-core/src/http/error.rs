//! Failure classification for backend calls
//!
//! Every failed attempt is classified exactly once, at the point where it
//! happens, into a [`RequestFailure`]. The retry loop then matches on the
//! variant instead of inspecting the error's shape.

use crate::http::auth::AuthError;
use crate::http::normalizer::ErrorRecord;
use std::fmt;

/// Identity-provider codes that mean the user has to log in again
pub const REAUTH_ERROR_CODES: [&str; 3] = ["login_required", "consent_required", "interaction_required"];

/// Broad kind of a failure, mostly for logs and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Credential,
    Transport,
    Authentication,
    Application,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Credential => write!(f, "credential"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Authentication => write!(f, "authentication"),
            FailureKind::Application => write!(f, "application"),
        }
    }
}

/// Why a call to the backend failed
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    /// The token provider could not produce a credential
    #[error("Could not obtain an access token: {0}")]
    Credential(#[source] AuthError),

    /// No response was received (DNS, connect, timeout, broken body)
    #[error("Transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend rejected the credential
    #[error("Authentication failed: {record}")]
    Auth {
        code: Option<String>,
        record: ErrorRecord,
    },

    /// Any other failed response
    #[error("Request failed: {0}")]
    Application(ErrorRecord),
}

impl RequestFailure {
    /// Classify a normalized error record
    pub fn from_record(record: ErrorRecord) -> Self {
        if is_reauth_record(&record) {
            Self::Auth {
                code: record.error.clone(),
                record,
            }
        } else {
            Self::Application(record)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Credential(_) => FailureKind::Credential,
            Self::Transport(_) => FailureKind::Transport,
            Self::Auth { .. } => FailureKind::Authentication,
            Self::Application(_) => FailureKind::Application,
        }
    }

    /// HTTP status, 0 when no response was received
    pub fn status(&self) -> u16 {
        self.record().map(|r| r.status).unwrap_or(0)
    }

    /// The normalized record, when the failure came from a response
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Auth { record, .. } | Self::Application(record) => Some(record),
            Self::Credential(_) | Self::Transport(_) => None,
        }
    }

    /// Present any failure as an [`ErrorRecord`]
    ///
    /// Failures without a response become status 0 with the error text as
    /// the message.
    pub fn to_record(&self) -> ErrorRecord {
        match self {
            Self::Auth { record, .. } | Self::Application(record) => record.clone(),
            Self::Credential(err) => ErrorRecord::from_message(0, err.to_string()),
            Self::Transport(err) => ErrorRecord::from_message(0, err.to_string()),
        }
    }

    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the user has to log in again before this can succeed
    ///
    /// True for backend rejections and for token failures carrying an
    /// identity-provider re-authentication code.
    pub fn requires_login(&self) -> bool {
        match self {
            Self::Auth { .. } => true,
            Self::Credential(err) => err
                .code()
                .map(|code| REAUTH_ERROR_CODES.contains(&code))
                .unwrap_or(false),
            Self::Transport(_) | Self::Application(_) => false,
        }
    }
}

fn is_reauth_record(record: &ErrorRecord) -> bool {
    let code_requires_login = record
        .error
        .as_deref()
        .map(|code| REAUTH_ERROR_CODES.contains(&code))
        .unwrap_or(false);

    code_requires_login || matches!(record.status, 401 | 403)
}
