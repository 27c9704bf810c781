//! Tracing subscriber setup and macro prelude.

/// Import the level macros without colliding with this module's name.
pub mod prelude {
    pub use ::tracing::{debug, error, info, trace, warn};
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
