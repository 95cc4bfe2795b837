use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "ZTCTL_DATA_DIR";
pub const ENV_SETTINGS_DIR: &str = "ZTCTL_SETTINGS_DIR";
pub const ENV_UNIT: &str = "ZTCTL_UNIT";
pub const ENV_DEBUG: &str = "ZTCTL_DEBUG";
pub const ENV_TIMEOUT_SECS: &str = "ZTCTL_TIMEOUT_SECS";
pub const ENV_INSTALL_URL: &str = "ZTCTL_INSTALL_URL";
pub const ENV_SUDO_PASSWORD: &str = "ZTCTL_SUDO_PASSWORD";

const BACKEND_DATA_SUBDIR: &str = ".zerotier-one";
const SETTINGS_SUBDIR: &str = "zerotier-ctl";
const DEFAULT_UNIT: &str = "zerotier-one";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_INSTALL_URL: &str = "https://raw.githubusercontent.com/aaron777collins/ZeroTier-GUI-Arch/master/download_and_reinstall_backend.sh";

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Invoking user's home directory.
pub fn home_dir() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    tracing::trace!(dir = %dir.display(), "Resolved home directory");
    dir
}

/// Backend data directory ($ZTCTL_DATA_DIR or ~/.zerotier-one)
pub fn data_dir() -> PathBuf {
    let dir = env_opt(ENV_DATA_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(BACKEND_DATA_SUBDIR));
    tracing::trace!(dir = %dir.display(), "Resolved backend data directory");
    dir
}

/// Settings directory ($ZTCTL_SETTINGS_DIR or ~/.local/share/zerotier-ctl)
pub fn settings_dir() -> PathBuf {
    let dir = env_opt(ENV_SETTINGS_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| home_dir().join(".local/share"))
                .join(SETTINGS_SUBDIR)
        });
    tracing::trace!(dir = %dir.display(), "Resolved settings directory");
    dir
}

pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Service-manager unit name ($ZTCTL_UNIT or "zerotier-one")
pub fn unit_name() -> String {
    let unit = env_opt(ENV_UNIT).unwrap_or_else(|| DEFAULT_UNIT.to_string());
    tracing::trace!(unit = %unit, "Service unit");
    unit
}

/// Whether the sandbox-hop prefix is disabled ($ZTCTL_DEBUG truthy)
pub fn sandbox_hop_disabled() -> bool {
    let disabled = env_opt(ENV_DEBUG).as_deref().map(is_truthy).unwrap_or(false);
    tracing::trace!(disabled = disabled, "Sandbox hop disabled check");
    disabled
}

/// Per-execution timeout ($ZTCTL_TIMEOUT_SECS or 120s)
pub fn command_timeout() -> Duration {
    let secs = env_opt(ENV_TIMEOUT_SECS)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    tracing::trace!(secs = secs, "Command timeout");
    Duration::from_secs(secs)
}

/// Reinstall script URL ($ZTCTL_INSTALL_URL or the published script)
pub fn install_script_url() -> String {
    let url = env_opt(ENV_INSTALL_URL).unwrap_or_else(|| DEFAULT_INSTALL_URL.to_string());
    tracing::trace!(url = %url, "Install script URL");
    url
}

/// Elevation secret for non-interactive runs ($ZTCTL_SUDO_PASSWORD)
pub fn sudo_password_env() -> Option<String> {
    let val = env_opt(ENV_SUDO_PASSWORD);
    tracing::trace!(present = val.is_some(), "ZTCTL_SUDO_PASSWORD env var");
    val
}

/// Invoking user name ($USER, then $LOGNAME). Used to match the sudo
/// credential-prompt banner, which embeds the user name.
pub fn username() -> String {
    env_opt("USER")
        .or_else(|| env_opt("LOGNAME"))
        .unwrap_or_else(|| "root".to_string())
}
