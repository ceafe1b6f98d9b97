use std::path::{Path, PathBuf};
use std::time::Duration;

use pupila_frame::DEFAULT_MAX_PAYLOAD;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::socket::{InputPullSocket, OutputPushSocket};

pub const DEFAULT_INPUT_PATH: &str = "/tmp/pupila-input.sock";
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/pupila-output.sock";
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 100;

pub const ENV_USER_MODULE: &str = "PUPILA_USER_MODULE";
pub const ENV_INPUT: &str = "PUPILA_INPUT";
pub const ENV_OUTPUT: &str = "PUPILA_OUTPUT";

/// Worker settings.
///
/// Layered lowest to highest: defaults, JSON file, environment, command
/// line. The CLI applies the last layer itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Registered unit key or path to the user module library.
    pub user_module: Option<String>,
    /// Socket the worker listens on for upstream frames.
    pub input: PathBuf,
    /// Socket of the downstream stage.
    pub output: PathBuf,
    /// Bounded wait for each upstream receive.
    pub recv_timeout_ms: u64,
    /// Largest frame payload accepted or sent.
    pub max_payload_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            user_module: None,
            input: PathBuf::from(DEFAULT_INPUT_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl WorkerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `PUPILA_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(user_module) = get(ENV_USER_MODULE) {
            self.user_module = Some(user_module);
        }
        if let Some(input) = get(ENV_INPUT) {
            self.input = PathBuf::from(input);
        }
        if let Some(output) = get(ENV_OUTPUT) {
            self.output = PathBuf::from(output);
        }
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    /// Reject settings the sockets cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "recv_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_payload_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_payload_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.input == self.output {
            return Err(ConfigError::Invalid {
                field: "output",
                reason: format!("same path as input ({})", self.input.display()),
            });
        }
        Ok(())
    }

    /// The configured user module, if set and non-blank.
    pub fn user_module(&self) -> Option<&str> {
        self.user_module
            .as_deref()
            .map(str::trim)
            .filter(|module| !module.is_empty())
    }

    pub fn input_socket(&self) -> InputPullSocket {
        InputPullSocket::new(&self.input, self.recv_timeout())
            .with_max_payload_size(self.max_payload_size)
    }

    pub fn output_socket(&self) -> OutputPushSocket {
        OutputPushSocket::new(&self.output).with_max_payload_size(self.max_payload_size)
    }
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let input = input.trim();
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number.trim().parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn write_config(tag: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pupila-config-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("worker.json");
        std::fs::write(&path, contents).expect("config should be writable");
        path
    }

    #[test]
    fn defaults_are_usable() {
        let config = WorkerConfig::default();
        assert_eq!(config.input, PathBuf::from(DEFAULT_INPUT_PATH));
        assert_eq!(config.recv_timeout(), Duration::from_millis(100));
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert!(config.user_module().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_fields_override_defaults() {
        let path = write_config(
            "partial",
            r#"{"user_module": "builtin:identity", "recv_timeout_ms": 250}"#,
        );
        let config = WorkerConfig::from_file(&path).expect("config should parse");

        assert_eq!(config.user_module(), Some("builtin:identity"));
        assert_eq!(config.recv_timeout_ms, 250);
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT_PATH));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let path = write_config("unknown", r#"{"user_modul": "typo"}"#);
        let err = WorkerConfig::from_file(&path).expect_err("typo must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = WorkerConfig::from_file("/no/such/pupila.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_USER_MODULE, "/opt/units/blur.so"),
            (ENV_INPUT, "/run/in.sock"),
            (ENV_OUTPUT, "  "),
        ]);
        let mut config = WorkerConfig {
            user_module: Some("from-file".to_string()),
            ..WorkerConfig::default()
        };

        config.apply_lookup(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.user_module(), Some("/opt/units/blur.so"));
        assert_eq!(config.input, PathBuf::from("/run/in.sock"));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }

    #[test]
    fn blank_user_module_counts_as_missing() {
        let config = WorkerConfig {
            user_module: Some("   ".to_string()),
            ..WorkerConfig::default()
        };
        assert!(config.user_module().is_none());
    }

    #[test]
    fn validate_rejects_zero_timeout_and_shared_path() {
        let mut config = WorkerConfig {
            recv_timeout_ms: 0,
            ..WorkerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "recv_timeout_ms", .. })
        ));

        config.recv_timeout_ms = 10;
        config.output = config.input.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "output", .. })
        ));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration(" 5s ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn set_recv_timeout_rounds_to_millis() {
        let mut config = WorkerConfig::default();
        config.set_recv_timeout(Duration::from_millis(1500));
        assert_eq!(config.recv_timeout_ms, 1500);
    }
}
