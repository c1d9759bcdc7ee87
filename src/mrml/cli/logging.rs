//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; this module installs the
//! subscriber. `RUST_LOG` wins over `-v` when it is set.
//!
//! - 0 (no `-v`): warn
//! - 1 (`-v`): info, import/restore summaries
//! - 2 (`-vv`): debug, node adds/removes and id assignment
//! - 3+ : trace

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mrml={}", level.as_str().to_lowercase())))
}

/// Installs the global subscriber, writing to stderr. A second call is a
/// no-op.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init();
}
