use crate::clienv;
use crate::credentials::Credential;
use crate::error::{BackendError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Declarative description of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
    pub privileged: bool,
    pub merge_stderr: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            working_dir: clienv::home_dir(),
            privileged: false,
            merge_stderr: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn privileged(mut self, yes: bool) -> Self {
        self.privileged = yes;
        self
    }

    pub fn merge_stderr(mut self, yes: bool) -> Self {
        self.merge_stderr = yes;
        self
    }
}

/// Captured outcome of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Wrap every spawn in the sandbox-hop prefix so it runs against the
    /// host instead of the flatpak runtime.
    pub sandbox_hop: bool,
    pub timeout: Duration,
}

impl ExecOptions {
    pub fn from_env() -> Self {
        Self {
            sandbox_hop: !clienv::sandbox_hop_disabled(),
            timeout: clienv::command_timeout(),
        }
    }
}

/// Seam between command issuers (service controller, backend client,
/// recovery) and real process spawning. Tests substitute a scripted runner.
pub trait CommandRunner {
    fn run(&self, spec: CommandSpec) -> impl Future<Output = Result<CommandResult>> + Send;
}

/// Spawns external commands, injecting the elevation secret on stdin for
/// privileged specs. No retry happens here; retry policy belongs to callers.
pub struct Executor {
    credential: Credential,
    options: ExecOptions,
    username: String,
}

impl Executor {
    pub fn new(credential: Credential, options: ExecOptions) -> Self {
        Self {
            credential,
            options,
            username: clienv::username(),
        }
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }

    /// The literal prompt echo sudo writes to the terminal stream; always
    /// stripped from results handed to callers.
    fn prompt_banner(&self) -> String {
        format!("[sudo] password for {}: ", self.username)
    }

    fn final_argv(&self, spec: &CommandSpec) -> Vec<String> {
        let mut argv = spec.argv.clone();
        if spec.privileged {
            let mut wrapped = vec!["sudo".to_string(), "-S".to_string()];
            wrapped.append(&mut argv);
            argv = wrapped;
        }
        if self.options.sandbox_hop {
            let mut wrapped = vec!["flatpak-spawn".to_string(), "--host".to_string()];
            wrapped.append(&mut argv);
            argv = wrapped;
        }
        argv
    }

    pub async fn execute(&self, spec: &CommandSpec) -> Result<CommandResult> {
        if spec.privileged && self.credential.is_empty() {
            warn!("Privileged execution attempted with an empty credential");
            return Err(BackendError::Authentication);
        }
        if !Path::new(&spec.working_dir).exists() {
            debug!(dir = %spec.working_dir.display(), "Working directory missing, not spawning");
            return Err(BackendError::DirectoryMissing(spec.working_dir.clone()));
        }

        let argv = self.final_argv(spec);
        debug!(argv = ?argv, dir = %spec.working_dir.display(), privileged = spec.privileged,
               "Spawning command");

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .current_dir(&spec.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if spec.privileged {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd.spawn()?;

        if spec.privileged {
            let mut stdin = child.stdin.take().expect("stdin was piped");
            let mut secret = self.credential.secret().as_bytes().to_vec();
            secret.push(b'\n');
            stdin.write_all(&secret).await?;
            // Dropping the handle closes the stream; sudo reads exactly one
            // line and must not block on a second attempt.
            drop(stdin);
        }

        let output = match tokio::time::timeout(self.options.timeout, child.wait_with_output())
            .await
        {
            Ok(output) => output?,
            Err(_) => {
                warn!(timeout = ?self.options.timeout, "Command timed out, killing");
                return Err(BackendError::Timeout(self.options.timeout));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout_raw = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr_raw = String::from_utf8_lossy(&output.stderr).into_owned();

        let (stdout_raw, stderr_raw) = if spec.merge_stderr {
            let mut merged = stdout_raw;
            merged.push_str(&stderr_raw);
            (merged, String::new())
        } else {
            (stdout_raw, stderr_raw)
        };

        debug!(exit_code = exit_code, "Command finished");

        if !output.status.success() {
            let mut raw = stdout_raw;
            if !stderr_raw.is_empty() {
                raw.push_str(&stderr_raw);
            }
            if spec.privileged && is_credential_rejection(&raw) {
                warn!("Privileged command rejected the credential");
                return Err(BackendError::Authentication);
            }
            return Err(BackendError::Process {
                code: exit_code,
                output: raw,
            });
        }

        let banner = self.prompt_banner();
        Ok(CommandResult {
            exit_code,
            stdout: stdout_raw.replace(&banner, ""),
            stderr: stderr_raw.replace(&banner, ""),
        })
    }
}

impl CommandRunner for Executor {
    fn run(&self, spec: CommandSpec) -> impl Future<Output = Result<CommandResult>> + Send {
        async move { self.execute(&spec).await }
    }
}

fn is_credential_rejection(output: &str) -> bool {
    output.contains("incorrect password attempt") || output.contains("Sorry, try again")
}
