use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pupila_worker::{parse_duration, UnitLoader, Worker, WorkerConfig};

use crate::cmd::WorkerArgs;
use crate::exit::{config_error, worker_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: WorkerArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args, |key| std::env::var(key).ok())?;
    let user_module = config.user_module().unwrap_or_default().to_string();

    let cancel = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(cancel.clone())?;

    let loader = UnitLoader::new();
    let mut worker = Worker::new(user_module);
    let report = worker
        .start(
            &loader,
            config.input_socket(),
            config.output_socket(),
            &cancel,
        )
        .map_err(|err| worker_error("worker failed", err))?;

    print_report(&report, format);
    if report.stop_reason.is_fault() {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

/// Layer defaults, the config file, `lookup` (the environment) and flags.
fn resolve_config(
    args: &WorkerArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliResult<WorkerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            WorkerConfig::from_file(path).map_err(|err| config_error("config load failed", err))?
        }
        None => WorkerConfig::default(),
    };

    config.apply_lookup(lookup);

    if let Some(user_module) = &args.user_module {
        config.user_module = Some(user_module.clone());
    }
    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(timeout) = &args.recv_timeout {
        let timeout =
            parse_duration(timeout).map_err(|err| config_error("invalid --recv-timeout", err))?;
        config.set_recv_timeout(timeout);
    }

    config
        .validate()
        .map_err(|err| config_error("invalid configuration", err))?;
    Ok(config)
}

fn install_ctrlc_handler(cancel: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::exit::USAGE;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pupila-cli-config-{}-{}",
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
    fn flags_beat_env_beat_file() {
        let path = write_config(
            r#"{"user_module": "file.so", "input": "/tmp/file-in.sock", "output": "/tmp/file-out.sock"}"#,
        );
        let env = HashMap::from([
            ("PUPILA_USER_MODULE", "env.so"),
            ("PUPILA_INPUT", "/tmp/env-in.sock"),
        ]);
        let args = WorkerArgs {
            user_module: Some("flag.so".to_string()),
            config: Some(path.clone()),
            ..WorkerArgs::default()
        };

        let config =
            resolve_config(&args, |key| env.get(key).map(|value| value.to_string())).unwrap();

        assert_eq!(config.user_module(), Some("flag.so"));
        assert_eq!(config.input, PathBuf::from("/tmp/env-in.sock"));
        assert_eq!(config.output, PathBuf::from("/tmp/file-out.sock"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn recv_timeout_flag_is_parsed() {
        let args = WorkerArgs {
            recv_timeout: Some("250ms".to_string()),
            ..WorkerArgs::default()
        };
        let config = resolve_config(&args, no_env).unwrap();
        assert_eq!(config.recv_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn bad_recv_timeout_is_usage_error() {
        let args = WorkerArgs {
            recv_timeout: Some("soon".to_string()),
            ..WorkerArgs::default()
        };
        let err = resolve_config(&args, no_env).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn unreadable_config_is_usage_error() {
        let args = WorkerArgs {
            config: Some(PathBuf::from("/no/such/worker.json")),
            ..WorkerArgs::default()
        };
        let err = resolve_config(&args, no_env).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
