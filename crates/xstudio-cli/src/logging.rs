//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so that `vfs cat` output on stdout stays clean.
//! `RUST_LOG` takes precedence over the `-v`/`-q` flags.

use std::io;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level for a verbosity count (`-v` adds, `-q` subtracts).
pub fn level_from_flags(verbose: u8, quiet: u8) -> Level {
    match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(level: Level) {
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn
        EnvFilter::new(format!("warn,xstudio={level},xstudio_core={level}"))
    });

    let layer = fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry().with(filter).with(layer).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level_from_flags(0, 0), Level::INFO);
        assert_eq!(level_from_flags(1, 0), Level::DEBUG);
        assert_eq!(level_from_flags(3, 0), Level::TRACE);
        assert_eq!(level_from_flags(0, 1), Level::WARN);
        assert_eq!(level_from_flags(0, 5), Level::ERROR);
    }
}
