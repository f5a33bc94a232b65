//! Logging initialization.
//!
//! Installs a `tracing` subscriber for the process. The level is read from
//! `RUST_LOG` (e.g. `info`, `fxledger_settlement=debug,info`) and defaults
//! to `info`.

use fxledger_types::{LedgerError, LogFormat, Result, constants};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber in the given format.
///
/// # Errors
/// [`LedgerError::Configuration`] if a global subscriber is already set.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(true),
            )
            .try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|e| LedgerError::Configuration(format!("logging already initialized: {e}")))?;

    tracing::info!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        format = ?format,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_configuration_error() {
        // Another test may already have installed one; the second call fails
        // either way.
        let _ = init_logging(LogFormat::Compact);
        let err = init_logging(LogFormat::Json).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }
}
