use crate::clienv;
use crate::error::{BackendError, Result};
use crate::executor::{CommandRunner, CommandSpec};
use crate::extract::extract_first_json;
use crate::model::{InterfaceAddr, Network, NodeStatus, Peer};
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The management tool ships inside the backend data directory for static
/// installs, so it is invoked relative to that directory.
const BACKEND_TOOL: &str = "./zerotier-cli";

/// Map a backend tool exit status into the failure taxonomy.
///
/// 2: the invoking user cannot read the daemon's authorization token.
/// 1: the daemon is not running. 127: the tool itself is not installed.
pub fn classify_exit(code: i32, output: String) -> BackendError {
    match code {
        2 => BackendError::NoAuthorization { output },
        1 => BackendError::ServiceUnavailable { output },
        127 => BackendError::BinaryMissing { output },
        _ => BackendError::UnknownRuntime { code, output },
    }
}

/// Client for the backend's CLI management tool. Always privileged; honors
/// the persisted `service_enabled` flag by short-circuiting to an empty
/// result without spawning anything.
pub struct BackendCli<'a, R> {
    runner: &'a R,
    data_dir: PathBuf,
    settings_path: PathBuf,
}

impl<'a, R: CommandRunner> BackendCli<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            data_dir: clienv::data_dir(),
            settings_path: clienv::settings_path(),
        }
    }

    pub fn with_paths(
        runner: &'a R,
        data_dir: impl Into<PathBuf>,
        settings_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            data_dir: data_dir.into(),
            settings_path: settings_path.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn run(&self, args: &[&str]) -> Result<String> {
        self.invoke(args, false).await
    }

    pub async fn run_merged(&self, args: &[&str]) -> Result<String> {
        self.invoke(args, true).await
    }

    async fn invoke(&self, args: &[&str], merge_stderr: bool) -> Result<String> {
        // The flag is re-read before every invocation; another front-end may
        // have flipped it since this process started.
        let settings = Settings::load_from(&self.settings_path);
        if !settings.service_enabled {
            info!(args = ?args, "Backend disabled by settings, skipping invocation");
            return Ok(String::new());
        }

        let spec = CommandSpec::new(BACKEND_TOOL)
            .arg(format!("-D{}", self.data_dir.display()))
            .args(args.iter().copied())
            .current_dir(&self.data_dir)
            .privileged(true)
            .merge_stderr(merge_stderr);

        match self.runner.run(spec).await {
            Ok(result) => Ok(result.stdout),
            Err(BackendError::Process { code, output }) => {
                debug!(code = code, "Backend tool failed, classifying");
                Err(classify_exit(code, output))
            }
            Err(err) => Err(err),
        }
    }

    fn json_payload(output: &str) -> Result<String> {
        extract_first_json(output).ok_or(BackendError::Extraction)
    }

    /// Joined networks, `-j listnetworks`.
    pub async fn networks(&self) -> Result<Vec<Network>> {
        let output = self.run(&["-j", "listnetworks"]).await?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&Self::json_payload(&output)?)?)
    }

    /// Known peers with their physical paths, `-j peers`.
    pub async fn peers(&self) -> Result<Vec<Peer>> {
        let output = self.run(&["-j", "peers"]).await?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&Self::json_payload(&output)?)?)
    }

    /// Node identity and online state, `status`.
    pub async fn node_status(&self) -> Result<Option<NodeStatus>> {
        let output = self.run(&["status"]).await?;
        Ok(NodeStatus::parse(&output))
    }

    pub async fn join(&self, network_id: &str) -> Result<String> {
        info!(network = %network_id, "Joining network");
        self.run(&["join", network_id]).await
    }

    pub async fn leave(&self, network_id: &str) -> Result<String> {
        info!(network = %network_id, "Leaving network");
        self.run(&["leave", network_id]).await
    }

    /// Change a per-network option. The tool prints usage errors on stderr,
    /// so both streams are captured together here.
    pub async fn set(&self, network_id: &str, option: &str, value: &str) -> Result<String> {
        let assignment = format!("{}={}", option, value);
        info!(network = %network_id, assignment = %assignment, "Setting network option");
        self.run_merged(&["set", network_id, &assignment]).await
    }

    /// Interface states from `ip --json address`. Not a backend tool call:
    /// no exit-code classification applies.
    pub async fn interface_addrs(&self) -> Result<Vec<InterfaceAddr>> {
        let spec = CommandSpec::new("ip")
            .args(["--json", "address"])
            .current_dir(&self.data_dir)
            .privileged(true);
        let result = self.runner.run(spec).await?;
        let payload = Self::json_payload(&result.stdout)?;
        Ok(serde_json::from_str(&payload)?)
    }

    pub async fn interface_state(&self, device: &str) -> Result<String> {
        let addrs = self.interface_addrs().await?;
        Ok(addrs
            .into_iter()
            .find(|addr| addr.ifname == device)
            .and_then(|addr| addr.operstate)
            .unwrap_or_else(|| "UNKNOWN".to_string()))
    }

    /// Bring a backend-managed interface up or down.
    pub async fn set_interface_up(&self, device: &str, up: bool) -> Result<()> {
        let state = if up { "up" } else { "down" };
        info!(device = %device, state = %state, "Toggling interface");
        let spec = CommandSpec::new("ip")
            .args(["link", "set", device, state])
            .current_dir(&self.data_dir)
            .privileged(true);
        self.runner.run(spec).await?;
        Ok(())
    }
}
