//! Tracing initialization with configurable logging formats.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// level and filter directives.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let filter = build_env_filter(config);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Pretty, false) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .without_time()
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Compact, true) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Compact, false) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .without_time()
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Json, true) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Json, false) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .without_time()
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let base_level = config.level.as_str();

    // Check for RUST_LOG environment variable first
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else if let Some(filter) = &config.filter {
        let combined = format!("{},{}", base_level, filter);
        EnvFilter::try_new(combined).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else {
        // Default filter that quiets noisy crates
        EnvFilter::new(format!("{},hyper=warn,h2=warn,reqwest=warn", base_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    #[serial_test::serial]
    fn test_filter_prefers_rust_log() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filter: Some("llm_router=trace".into()),
            ..Default::default()
        };
        let filter = temp_env::with_var("RUST_LOG", Some("llm_router=debug"), || {
            build_env_filter(&config)
        });
        let rendered = filter.to_string();
        assert!(rendered.contains("llm_router=debug"), "got: {rendered}");
        assert!(!rendered.contains("trace"), "got: {rendered}");
    }

    #[test]
    #[serial_test::serial]
    fn test_filter_combines_level_and_directives() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filter: Some("llm_router=trace".into()),
            ..Default::default()
        };
        let filter = temp_env::with_var_unset("RUST_LOG", || build_env_filter(&config));
        let rendered = filter.to_string();
        assert!(rendered.contains("llm_router=trace"), "got: {rendered}");
        assert!(rendered.contains("warn"), "got: {rendered}");
    }

    #[test]
    #[serial_test::serial]
    fn test_default_filter_quiets_http_stack() {
        let filter = temp_env::with_var_unset("RUST_LOG", || {
            build_env_filter(&LoggingConfig::default())
        });
        let rendered = filter.to_string();
        assert!(rendered.contains("reqwest=warn"), "got: {rendered}");
        assert!(rendered.contains("hyper=warn"), "got: {rendered}");
    }
}
