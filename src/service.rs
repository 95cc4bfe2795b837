use crate::clienv;
use crate::error::{BackendError, Result};
use crate::executor::{CommandRunner, CommandSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Closed set of verbs issued against the backend's unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Enable,
    Disable,
    Show,
    IsActive,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Show => "show",
            Self::IsActive => "is-active",
        }
    }
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-manager `ActiveState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Inactive,
    Failed,
    Activating,
    Deactivating,
    Unknown,
}

impl ServiceState {
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "failed" => Self::Failed,
            "activating" => Self::Activating,
            "deactivating" => Self::Deactivating,
            _ => Self::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Active | Self::Activating)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
            Self::Activating => "activating",
            Self::Deactivating => "deactivating",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Controls the backend's unit, preferring the user-scope service manager and
/// falling back to the privileged system scope. The unit may be registered at
/// either scope depending on how the backend was installed.
pub struct ServiceController<'a, R> {
    runner: &'a R,
    unit: String,
    home: PathBuf,
}

impl<'a, R: CommandRunner> ServiceController<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            unit: clienv::unit_name(),
            home: clienv::home_dir(),
        }
    }

    pub fn with_unit(runner: &'a R, unit: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            unit: unit.into(),
            home: home.into(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Run one action, user scope first, privileged system scope second.
    /// A failure that survives both tiers is surfaced, never swallowed.
    pub async fn manage(&self, action: ServiceAction) -> Result<String> {
        debug!(action = %action, unit = %self.unit, "Managing service (user scope)");
        let user_spec = CommandSpec::new("systemctl")
            .arg("--user")
            .arg(action.as_str())
            .arg(&self.unit)
            .current_dir(&self.home)
            .merge_stderr(true);

        match self.runner.run(user_spec).await {
            Ok(result) => Ok(result.stdout),
            Err(user_err) => {
                warn!(action = %action, error = %user_err,
                      "User-scope control failed, retrying at system scope");
                self.manage_system(action).await
            }
        }
    }

    /// Issue an action directly at system scope, skipping the user tier.
    /// Used against a competing system-scope copy of the unit.
    pub async fn manage_system(&self, action: ServiceAction) -> Result<String> {
        debug!(action = %action, unit = %self.unit, "Managing service (system scope)");
        let spec = CommandSpec::new("systemctl")
            .arg(action.as_str())
            .arg(&self.unit)
            .current_dir(&self.home)
            .privileged(true)
            .merge_stderr(true);
        match self.runner.run(spec).await {
            Ok(result) => Ok(result.stdout),
            Err(err) => {
                warn!(action = %action, error = %err, "System-scope control failed");
                Err(err)
            }
        }
    }

    /// System-scope `is-active` state, tolerant of the non-zero exit the
    /// service manager uses for inactive units.
    pub async fn system_state(&self) -> Result<ServiceState> {
        match self.manage_system(ServiceAction::IsActive).await {
            Ok(output) => Ok(ServiceState::parse(&output)),
            Err(BackendError::Process { output, .. }) => Ok(ServiceState::parse(&output)),
            Err(err) => Err(err),
        }
    }

    /// Current unit state from the `show` property dump.
    pub async fn state(&self) -> Result<ServiceState> {
        let dump = self.manage(ServiceAction::Show).await?;
        let properties = parse_properties(&dump);
        let state = properties
            .get("ActiveState")
            .map(|v| ServiceState::parse(v))
            .unwrap_or(ServiceState::Unknown);
        debug!(state = %state, "Service state from property dump");
        Ok(state)
    }

    /// Current unit state from `is-active`. The service manager exits
    /// non-zero for inactive and failed units, so the state is read from the
    /// failure output as well.
    pub async fn active_state(&self) -> Result<ServiceState> {
        match self.manage(ServiceAction::IsActive).await {
            Ok(output) => Ok(ServiceState::parse(&output)),
            Err(BackendError::Process { output, .. }) => Ok(ServiceState::parse(&output)),
            Err(err) => Err(err),
        }
    }
}

/// Parse a `key=value` per line property dump into a mapping. Lines without
/// `=` are skipped; values keep any further `=` characters.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}
