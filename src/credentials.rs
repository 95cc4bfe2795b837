use crate::clienv;
use anyhow::{Context, Result};
use dialoguer::Password;

/// Elevation secret held for the process lifetime.
///
/// Never persisted and never logged; `Debug` is redacted. The session layer
/// replaces it when a privileged execution fails with an authentication-class
/// error.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Acquire the elevation secret: $ZTCTL_SUDO_PASSWORD when set, otherwise an
/// interactive hidden prompt.
pub fn acquire() -> Result<Credential> {
    if let Some(secret) = clienv::sudo_password_env() {
        tracing::debug!("Using elevation secret from environment");
        return Ok(Credential::new(secret));
    }
    prompt("Enter your sudo password")
}

/// Re-prompt after a rejected credential.
pub fn reacquire() -> Result<Credential> {
    prompt("Authentication failed, enter your sudo password again")
}

fn prompt(message: &str) -> Result<Credential> {
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        anyhow::bail!(
            "stdin is not a terminal; set {} to run unattended",
            clienv::ENV_SUDO_PASSWORD
        );
    }
    let secret = Password::new()
        .with_prompt(message)
        .interact()
        .context("Failed to read password from terminal")?;
    Ok(Credential::new(secret))
}
