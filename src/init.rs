//! Process initialization: logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// `filter` is an `EnvFilter` directive such as `info` or
/// `visit_log=debug,tower_http=info`; an unparsable directive falls back to
/// `info`. Calling this more than once is harmless.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true));

    let _ = tracing::subscriber::set_global_default(registry);
}
