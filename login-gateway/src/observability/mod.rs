//! Observability (logging and tracing)
//!
//! Structured logging through `tracing`. Request spans come from the
//! `TraceLayer` installed by [`crate::routes::router`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
#[must_use]
pub fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) {
        EnvFilter::new("info,login_gateway=debug,tower_http=debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Initialize the tracing subscriber
///
/// Pretty output in debug builds, JSON in release builds. `RUST_LOG`
/// overrides the default filter.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    }

    Ok(())
}
