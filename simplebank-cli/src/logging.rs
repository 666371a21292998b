//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Filtering follows `RUST_LOG` and defaults to `warn` so normal command
/// output stays clean. Logs go to stderr. Does nothing when a subscriber is
/// already installed.
pub fn init(json: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // Commands still work without logs, so report and carry on
    if let Err(e) = result {
        eprintln!("warning: logging disabled: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
        assert!(tracing::dispatcher::has_been_set());
    }
}
