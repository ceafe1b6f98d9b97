use std::fmt;

use pupila_worker::{ConfigError, WorkerError};

pub const SUCCESS: i32 = 0;
/// The worker drained cleanly after an unexpected fault.
pub const FAILURE: i32 = 1;
/// Missing user module or unusable configuration.
pub const USAGE: i32 = 64;
/// The user module could not be loaded or instantiated.
pub const USER_MODULE: i32 = 65;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn worker_error(context: &str, err: WorkerError) -> CliError {
    let code = match &err {
        WorkerError::MissingConfiguration(_) => USAGE,
        WorkerError::UserModule(_) => USER_MODULE,
        WorkerError::Malformed(_) | WorkerError::Socket(_) | WorkerError::Unit(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pupila_worker::LoadError;

    use super::*;

    #[test]
    fn missing_configuration_is_usage() {
        let err = worker_error(
            "worker failed",
            WorkerError::MissingConfiguration("user module path"),
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("worker failed: missing configuration"));
    }

    #[test]
    fn load_failure_has_its_own_code() {
        let err = worker_error(
            "worker failed",
            WorkerError::UserModule(LoadError::NotFound {
                path: PathBuf::from("/nope.so"),
            }),
        );
        assert_eq!(err.code, USER_MODULE);
        assert_ne!(USER_MODULE, USAGE);
    }

    #[test]
    fn config_errors_are_usage() {
        let err = config_error("bad config", ConfigError::InvalidDuration("soon".to_string()));
        assert_eq!(err.code, USAGE);
        assert!(err.to_string().contains("soon"));
    }
}
