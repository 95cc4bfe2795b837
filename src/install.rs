use crate::clienv;
use crate::error::Result;
use crate::executor::{CommandRunner, CommandSpec};
use indicatif::ProgressBar;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// External installation procedure: runs to completion or fails. The
/// recovery machine only sequences it, it has no insight into the steps.
pub trait InstallProcedure {
    fn install(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Fetches the published reinstall script and runs it unprivileged from the
/// invoking user's home directory, the way the install pipeline documents.
pub struct ScriptInstaller<'a, R> {
    runner: &'a R,
    url: String,
    home: PathBuf,
}

impl<'a, R: CommandRunner> ScriptInstaller<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            url: clienv::install_script_url(),
            home: clienv::home_dir(),
        }
    }

    pub fn with_source(runner: &'a R, url: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            url: url.into(),
            home: home.into(),
        }
    }

    async fn fetch_script(&self) -> Result<String> {
        info!(url = %self.url, "Fetching backend install script");
        let spinner = ProgressBar::new_spinner().with_message("Downloading backend installer...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        let response = reqwest::get(&self.url).await?.error_for_status()?;
        let script = response.text().await?;
        spinner.finish_and_clear();
        Ok(script)
    }

    async fn run_script(&self, path: &Path) -> Result<()> {
        let spec = CommandSpec::new("sh")
            .arg(path.display().to_string())
            .current_dir(&self.home);
        self.runner.run(spec).await?;
        Ok(())
    }
}

impl<R: CommandRunner + Sync> InstallProcedure for ScriptInstaller<'_, R> {
    fn install(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let script = self.fetch_script().await?;

            let temp_dir = std::env::temp_dir().join("ztctl-install");
            std::fs::create_dir_all(&temp_dir)?;
            let script_path = temp_dir.join("reinstall-backend.sh");
            std::fs::write(&script_path, script)?;

            let outcome = self.run_script(&script_path).await;
            let _ = std::fs::remove_dir_all(&temp_dir);
            outcome?;

            info!("Backend install script completed");
            Ok(())
        }
    }
}
