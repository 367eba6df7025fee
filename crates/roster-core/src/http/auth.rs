//! Authentication collaborator interface
//!
//! The pipeline does not know how tokens are obtained. It asks a
//! [`TokenProvider`] for the current access token before every attempt, and
//! asks it to run an interactive login when the backend rejects the
//! credential or the provider reports [`AuthError::LoginRequired`].

use async_trait::async_trait;

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing access token: {0}")]
    MissingToken(String),

    #[error("Token acquisition failed: {0}")]
    TokenUnavailable(String),

    #[error("Interactive login is not available: {0}")]
    LoginUnavailable(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// The identity provider wants the user to log in again
    #[error("Login required ({code}): {message}")]
    LoginRequired { code: String, message: String },
}

impl AuthError {
    /// Identity-provider error code, when the provider reported one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::LoginRequired { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Source of bearer credentials and the re-authentication trigger
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token, without the `Bearer ` prefix
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Start an interactive re-authentication
    async fn login(&self) -> Result<(), AuthError>;
}

/// Token provider backed by a fixed token
///
/// There is nobody to ask for a new token, so `login` always fails.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Create with an explicit token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Create from an environment variable; a missing variable surfaces on first use
    pub fn from_env(var: &str) -> Self {
        Self {
            token: std::env::var(var).ok().filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.token
            .clone()
            .ok_or_else(|| AuthError::MissingToken("no access token configured".to_string()))
    }

    async fn login(&self) -> Result<(), AuthError> {
        Err(AuthError::LoginUnavailable(
            "a static token cannot be renewed interactively".to_string(),
        ))
    }
}
