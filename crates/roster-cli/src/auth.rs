//! Token providers for the CLI
//!
//! Tokens come from `--token` / `ROSTER_ACCESS_TOKEN`, the config file, or
//! a shell command that prints one. A configured login command is what the
//! pipeline runs when the backend rejects the credential, or when the token
//! command reports an identity-provider code such as `login_required`.

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use roster_core::{AuthError, StaticTokenProvider, TokenProvider, REAUTH_ERROR_CODES};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::Command;

/// Where the access token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// A token given up front
    Fixed(String),
    /// A shell command whose trimmed stdout is the token
    Command(String),
}

/// Token provider backed by shell commands
///
/// Command output is cached until the next login.
#[derive(Debug)]
pub struct CommandTokenProvider {
    source: TokenSource,
    login_command: Option<String>,
    cached: Mutex<Option<String>>,
}

impl CommandTokenProvider {
    pub fn new(source: TokenSource, login_command: Option<String>) -> Self {
        Self {
            source,
            login_command,
            cached: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<String> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: Option<String>) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

#[async_trait]
impl TokenProvider for CommandTokenProvider {
    async fn access_token(&self) -> std::result::Result<String, AuthError> {
        let command = match &self.source {
            TokenSource::Fixed(token) => return Ok(token.clone()),
            TokenSource::Command(command) => command,
        };

        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let token = capture_stdout(command).await.map_err(classify_command_failure)?;
        if token.is_empty() {
            return Err(AuthError::MissingToken(format!(
                "token command '{}' printed nothing",
                command
            )));
        }

        self.store(Some(token.clone()));
        Ok(token)
    }

    async fn login(&self) -> std::result::Result<(), AuthError> {
        let command = self.login_command.as_deref().ok_or_else(|| {
            AuthError::LoginUnavailable("no auth.login_command configured".to_string())
        })?;

        tracing::info!(command = %command, "running login command");
        let status = shell(command)
            .status()
            .await
            .map_err(|e| AuthError::LoginFailed(format!("failed to run '{}': {}", command, e)))?;

        if !status.success() {
            return Err(AuthError::LoginFailed(format!(
                "'{}' exited with {}",
                command, status
            )));
        }

        self.store(None);
        Ok(())
    }
}

/// Pick the token provider for this invocation
///
/// An explicit token wins over the config file's token, which wins over a
/// token command.
pub fn build_token_provider(cli_token: Option<&str>, auth: &AuthConfig) -> Result<Arc<dyn TokenProvider>> {
    let fixed = cli_token
        .or(auth.token.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match (fixed, &auth.token_command, &auth.login_command) {
        (Some(token), _, None) => Ok(Arc::new(StaticTokenProvider::new(token))),
        (Some(token), _, Some(login)) => Ok(Arc::new(CommandTokenProvider::new(
            TokenSource::Fixed(token.to_string()),
            Some(login.clone()),
        ))),
        (None, Some(command), login) => Ok(Arc::new(CommandTokenProvider::new(
            TokenSource::Command(command.clone()),
            login.clone(),
        ))),
        (None, None, _) => Err(Error::TokenMissing),
    }
}

async fn capture_stdout(command: &str) -> std::result::Result<String, String> {
    let output = shell(command)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to run '{}': {}", command, e))?;

    if !output.status.success() {
        return Err(format!(
            "'{}' exited with {}: {}",
            command,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A failing token command that names a re-authentication code asks for login
fn classify_command_failure(message: String) -> AuthError {
    let code = REAUTH_ERROR_CODES.iter().find(|code| {
        message
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|word| word == **code)
    });

    match code {
        Some(code) => AuthError::LoginRequired {
            code: code.to_string(),
            message,
        },
        None => AuthError::TokenUnavailable(message),
    }
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}
