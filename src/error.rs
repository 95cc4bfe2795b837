use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for backend control.
///
/// The executor only ever produces the spawn-level variants
/// (`DirectoryMissing`, `Process`, `Authentication`, `Timeout`, `Io`); the
/// backend client reclassifies `Process` exit codes into the tool-level
/// variants. Recovery is the only layer that acts on the classification.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("working directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("command exited with status {code}")]
    Process { code: i32, output: String },

    #[error("privileged execution rejected the supplied credential")]
    Authentication,

    #[error("command did not finish within {0:?}")]
    Timeout(Duration),

    #[error("backend service is not running")]
    ServiceUnavailable { output: String },

    #[error("current user has no backend authorization token")]
    NoAuthorization { output: String },

    #[error("backend tool is not installed")]
    BinaryMissing { output: String },

    #[error("backend tool failed with status {code}")]
    UnknownRuntime { code: i32, output: String },

    #[error("no balanced JSON payload found in command output")]
    Extraction,

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON payload")]
    Json(#[from] serde_json::Error),

    #[error("install script fetch failed")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// Exit status carried by the failure, when one exists.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Process { code, .. } | Self::UnknownRuntime { code, .. } => Some(*code),
            Self::ServiceUnavailable { .. } => Some(1),
            Self::NoAuthorization { .. } => Some(2),
            Self::BinaryMissing { .. } => Some(127),
            _ => None,
        }
    }

    /// Raw captured output carried by the failure, when one exists.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Process { output, .. }
            | Self::ServiceUnavailable { output }
            | Self::NoAuthorization { output }
            | Self::BinaryMissing { output }
            | Self::UnknownRuntime { output, .. } => Some(output),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_round_trip() {
        let err = BackendError::Process {
            code: 5,
            output: String::new(),
        };
        assert_eq!(err.exit_code(), Some(5));

        assert_eq!(
            BackendError::ServiceUnavailable {
                output: String::new()
            }
            .exit_code(),
            Some(1)
        );
        assert_eq!(
            BackendError::NoAuthorization {
                output: String::new()
            }
            .exit_code(),
            Some(2)
        );
        assert_eq!(
            BackendError::BinaryMissing {
                output: String::new()
            }
            .exit_code(),
            Some(127)
        );
        assert_eq!(BackendError::Extraction.exit_code(), None);
    }
}
