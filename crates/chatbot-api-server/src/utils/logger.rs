use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` when set, otherwise the configured directives.
fn filter_directives(config: &LoggingConfig) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

fn output_layers(config: &LoggingConfig, file: RollingFileAppender) -> Vec<BoxedLayer> {
    match config.format {
        LogFormat::Json => vec![
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed(),
            fmt::layer()
                .json()
                .with_writer(file)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed(),
        ],
        LogFormat::Pretty => vec![
            fmt::layer().pretty().with_writer(std::io::stdout).boxed(),
            fmt::layer().with_writer(file).with_ansi(false).boxed(),
        ],
    }
}

/// Stdout plus a daily rolling `{dir}/{file_prefix}.YYYY-MM-DD.log`.
pub fn init_logger(config: &LoggingConfig) -> Result<()> {
    let file = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.file_prefix.as_str())
        .filename_suffix("log")
        .build(&config.dir)
        .with_context(|| format!("Failed to open log directory {}", config.dir.display()))?;

    let directives = filter_directives(config);
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter '{}'", directives))?;

    tracing_subscriber::registry()
        .with(output_layers(config, file))
        .with(filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_layers_per_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LoggingConfig {
            dir: dir.path().to_path_buf(),
            ..LoggingConfig::default()
        };

        for format in [LogFormat::Json, LogFormat::Pretty] {
            config.format = format;
            let file = RollingFileAppender::new(Rotation::DAILY, &config.dir, "test.log");
            assert_eq!(output_layers(&config, file).len(), 2);
        }
    }

    #[test]
    fn test_configured_level_is_valid_filter() {
        let config = LoggingConfig::default();
        assert!(EnvFilter::try_new(&config.level).is_ok());
    }
}
