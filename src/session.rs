use crate::clienv;
use crate::credentials;
use crate::error::BackendError;
use crate::executor::{CommandSpec, ExecOptions, Executor};
use anyhow::Result;
use tracing::{info, warn};

/// Process-wide authenticated session. Commands that need elevation go
/// through the executor it carries; the credential inside has been validated
/// against a harmless privileged probe.
pub struct Session {
    executor: Executor,
}

impl Session {
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Acquire the elevation secret and validate it, re-prompting while the
    /// privileged probe keeps rejecting the credential.
    pub async fn establish(options: ExecOptions) -> Result<Session> {
        let mut executor = Executor::new(credentials::acquire()?, options);
        let probe = CommandSpec::new("true")
            .privileged(true)
            .current_dir(clienv::home_dir());

        loop {
            match executor.execute(&probe).await {
                Ok(_) => {
                    info!("Elevation credential validated");
                    return Ok(Self { executor });
                }
                Err(BackendError::Authentication) | Err(BackendError::Process { .. }) => {
                    warn!("Privileged probe rejected the credential, re-prompting");
                    executor.set_credential(credentials::reacquire()?);
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err).context("basic privileged probe failed"))
                }
            }
        }
    }
}
