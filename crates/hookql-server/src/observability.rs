//! Log output for the server.
//!
//! Logging starts at `info` before the config is read, then switches to the
//! `[logging]` section through a reload handle. `RUST_LOG` wins over both.

use std::sync::OnceLock;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Builds the filter for `logging`: the base level followed by the
/// per-target directives, e.g. `hookql::schema=debug`.
///
/// # Errors
///
/// Returns the first directive that does not parse.
pub fn build_filter(logging: &LoggingConfig) -> Result<EnvFilter, String> {
    let mut filter = EnvFilter::new(&logging.level);
    for directive in &logging.directives {
        let parsed = directive
            .parse::<Directive>()
            .map_err(|e| format!("invalid logging directive `{directive}`: {e}"))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Switches the running subscriber to `logging`. Does nothing while
/// `RUST_LOG` is set or before [`init_tracing`].
///
/// # Errors
///
/// Fails on an invalid directive or if the subscriber is gone.
pub fn apply_logging(logging: &LoggingConfig) -> Result<(), String> {
    if std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return Ok(());
    };
    let filter = build_filter(logging)?;
    handle
        .reload(filter)
        .map_err(|e| format!("failed to apply logging config: {e}"))?;
    tracing::debug!(
        level = %logging.level,
        directives = logging.directives.len(),
        "Logging config applied"
    );
    Ok(())
}
