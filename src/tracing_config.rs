//! Tracing setup for the CLI and tests.
//!
//! The subscriber is only installed when `WRAPCHECK_LOG` (or `RUST_LOG`) is
//! set, so normal runs pay nothing. Values use the usual `EnvFilter` syntax:
//!
//! ```bash
//! WRAPCHECK_LOG=debug wrapcheck graph.json
//! WRAPCHECK_LOG="wrapcheck_binder=trace,wrapcheck_analyzer=debug" wrapcheck graph.json
//! ```

use tracing_subscriber::EnvFilter;

/// Build an `EnvFilter` from `WRAPCHECK_LOG`, falling back to `RUST_LOG`.
fn env_filter() -> Option<EnvFilter> {
    let spec = std::env::var("WRAPCHECK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()?;
    if spec.is_empty() {
        return None;
    }
    Some(EnvFilter::new(spec))
}

/// Install the global subscriber if a filter is configured. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing() {
    let Some(filter) = env_filter() else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
