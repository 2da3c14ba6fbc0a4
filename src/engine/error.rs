use thiserror::Error;

/// Errors reported while evaluating a container
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to connect to container host: {0}")]
    Connection(String),

    #[error("Container host request failed: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Container has no base image; call `from` before evaluating it")]
    MissingBaseImage,

    #[error("Exec at operation {step} has an empty command")]
    EmptyCommand { step: usize },

    #[error("Command `{}` exited with code {exit_code}\n{stderr}", .command.join(" "))]
    ExecFailed {
        command: Vec<String>,
        exit_code: i64,
        stdout: String,
        stderr: String,
    },

    #[error("Service '{alias}' was not listening on port(s) {ports:?} after {timeout_secs}s")]
    ServiceNotReady {
        alias: String,
        ports: Vec<u16>,
        timeout_secs: u64,
    },

    #[error("Service '{alias}' exited before it became ready")]
    ServiceExited { alias: String },

    #[error("Invalid image reference '{0}'")]
    InvalidReference(String),

    #[error("Failed to publish {address}: {message}")]
    Publish { address: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{0}")]
    Scripted(String),
}

impl EngineError {
    /// Exit code of the failed command, when the failure was a command
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            EngineError::ExecFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_failed_message() {
        let err = EngineError::ExecFailed {
            command: vec!["./bin/phpunit".to_string()],
            exit_code: 2,
            stdout: String::new(),
            stderr: "FAILURES!".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("./bin/phpunit"));
        assert!(message.contains("code 2"));
        assert!(message.contains("FAILURES!"));
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_service_not_ready_message() {
        let err = EngineError::ServiceNotReady {
            alias: "db".to_string(),
            ports: vec![3306],
            timeout_secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "Service 'db' was not listening on port(s) [3306] after 30s"
        );
        assert_eq!(err.exit_code(), None);
    }
}
