pub mod backend;
pub mod clienv;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod extract;
pub mod install;
pub mod model;
pub mod recovery;
pub mod service;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{BackendError, Result};
pub use executor::{CommandResult, CommandRunner, CommandSpec, ExecOptions, Executor};
pub use extract::extract_first_json;
pub use recovery::{Recovery, RecoveryReport, RecoveryState};
pub use service::{ServiceAction, ServiceController, ServiceState};
