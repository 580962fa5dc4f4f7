use crate::config::LoggingConfig;
use crate::error::{PocketcamError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter_directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => level.to_ascii_lowercase(),
        _ => "warn".to_string(),
    };
    format!("pocketcam={}", level)
}

fn console_layer(format: &str, verbose: bool) -> BoxedLayer {
    match format {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(verbose)
            .with_file(verbose)
            .with_line_number(verbose)
            .boxed(),
        other => {
            eprintln!("Warning: Unknown log format '{}', using default", other);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(verbose)
                .with_file(verbose)
                .with_line_number(verbose)
                .boxed()
        }
    }
}

/// Install the global subscriber.
///
/// When `config.directory` is set, logs are also written to a daily rolling
/// file; keep the returned guard alive for as long as logs should be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let verbose = matches!(config.level.to_ascii_lowercase().as_str(), "debug" | "trace");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(&config.level)));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(&config.format, verbose)];

    let guard = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(Path::new(directory), "pocketcam.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| PocketcamError::system(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_directive() {
        assert_eq!(default_filter_directive("debug"), "pocketcam=debug");
        assert_eq!(default_filter_directive("INFO"), "pocketcam=info");
        assert_eq!(default_filter_directive("chatty"), "pocketcam=warn");
    }

    #[test]
    fn test_file_logging_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().join("logs");
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "compact".to_string(),
            directory: Some(directory.display().to_string()),
        };

        // Another test may already own the global subscriber
        if let Ok(guard) = init_logging(&config) {
            assert!(guard.is_some());
        }
        assert!(directory.is_dir());
    }
}
