use crate::clienv;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_service_enabled() -> bool {
    true
}

/// Persisted tool settings. The backend client reads `service_enabled`
/// before every invocation; everything else in the file belongs to other
/// front-ends and is carried through unchanged on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch: when false, backend tool invocations become no-ops.
    #[serde(default = "default_service_enabled")]
    pub service_enabled: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_enabled: true,
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        clienv::settings_path()
    }

    /// Load from the default location; absent or unparsable files yield the
    /// defaults rather than an error.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        tracing::trace!(path = %path.display(), "Loading settings");
        let Ok(content) = fs::read_to_string(path) else {
            tracing::trace!("Settings file missing, using defaults");
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "Settings file unparsable, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)?;
        tracing::trace!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_enabled() {
        let settings = Settings::load_from(Path::new("/nonexistent/settings.json"));
        assert!(settings.service_enabled);
    }

    #[test]
    fn unparsable_file_defaults_to_enabled() {
        let dir = std::env::temp_dir().join("ztctl-settings-test-garbage");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let settings = Settings::load_from(&path);
        assert!(settings.service_enabled);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn flag_round_trips() {
        let dir = std::env::temp_dir().join("ztctl-settings-test-roundtrip");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        let settings = Settings {
            service_enabled: false,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert!(!Settings::load_from(&path).service_enabled);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let dir = std::env::temp_dir().join("ztctl-settings-test-extra");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{"service_enabled": true, "theme": "dark", "refresh_secs": 30}"#,
        )
        .unwrap();

        let mut settings = Settings::load_from(&path);
        settings.service_enabled = false;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(&path);
        assert!(!reloaded.service_enabled);
        assert_eq!(*reloaded.extra.get("theme").unwrap(), "dark");
        assert_eq!(*reloaded.extra.get("refresh_secs").unwrap(), 30);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn absent_key_defaults_to_enabled() {
        let dir = std::env::temp_dir().join("ztctl-settings-test-absent");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "{}").unwrap();
        assert!(Settings::load_from(&path).service_enabled);
        fs::remove_dir_all(&dir).ok();
    }
}
