use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`. Everything else is capped at
/// `warn`.
const MPLEX_TARGETS: [&str; 3] = ["mplex", "mplex_frame", "mplex_crc"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    let filter = level.as_filter();
    Targets::new()
        .with_default(filter.min(LevelFilter::WARN))
        .with_targets(MPLEX_TARGETS.iter().map(|target| (*target, filter)))
}

/// Install the stderr subscriber. Targets are printed from `debug` on, where
/// group scanner and CRC events start to show up.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.as_filter() >= LevelFilter::DEBUG);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(targets(level)))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(targets(level)))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn mplex_crates_follow_requested_level() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("mplex_frame::codec", &Level::DEBUG));
        assert!(filter.would_enable("mplex_crc::engine", &Level::DEBUG));
        assert!(filter.would_enable("mplex", &Level::DEBUG));
        assert!(!filter.would_enable("mplex_frame::group", &Level::TRACE));
    }

    #[test]
    fn other_crates_are_capped_at_warn() {
        let filter = targets(LogLevel::Trace);
        assert!(!filter.would_enable("mio::poll", &Level::INFO));
        assert!(filter.would_enable("mio::poll", &Level::WARN));

        let quiet = targets(LogLevel::Error);
        assert!(!quiet.would_enable("mio::poll", &Level::WARN));
        assert!(!quiet.would_enable("mplex_frame", &Level::WARN));
        assert!(quiet.would_enable("mplex_frame", &Level::ERROR));
    }
}
