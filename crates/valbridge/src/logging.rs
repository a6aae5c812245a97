//! Log output for hosts and demos.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber.
///
/// Filtering comes from `RUST_LOG` when set, otherwise `default_directive`
/// (e.g. `"info"` or `"valbridge=debug"`). Returns `false` if a global
/// subscriber was already installed; calling this twice is harmless.
pub fn init(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("warn");
        assert!(!init("warn"));
    }
}
