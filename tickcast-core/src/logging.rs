//! Process-wide `tracing` subscriber setup.

use thiserror::Error;
use tracing_subscriber::filter::{Directive, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Noisy transport crates capped at `warn` unless the filter names them.
const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "rustls=warn"];

/// Build the filter: `RUST_LOG` if set, otherwise `filter`.
pub fn build_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }

    let mut env_filter = EnvFilter::try_new(filter).map_err(|e| LoggingError::Filter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })?;
    for target in QUIET_TARGETS {
        let crate_name = target.split('=').next().unwrap_or(target);
        if filter.contains(crate_name) {
            continue;
        }
        let directive = target
            .parse::<Directive>()
            .map_err(|e| LoggingError::Filter {
                filter: target.to_string(),
                reason: e.to_string(),
            })?;
        env_filter = env_filter.add_directive(directive);
    }
    Ok(env_filter)
}

/// Install a fmt subscriber writing to stderr, keeping stdout for command output.
pub fn init_logging(filter: &str) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(filter)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(
            build_filter("tickcast=loudest"),
            Err(LoggingError::Filter { .. })
        ));
    }

    #[test]
    fn accepts_plain_level() {
        assert!(build_filter("debug").is_ok());
    }
}
