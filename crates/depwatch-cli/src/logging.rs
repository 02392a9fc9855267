//! Logging initialization for the CLI.
//!
//! Logging is owned by the CLI crate to keep the library free of subscriber
//! setup. Everything goes to stderr so `--json` output on stdout stays a
//! single document.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - 0 = INFO, 1 = DEBUG, 2+ = TRACE
/// * `json` - If true, output JSON lines to stderr
///
/// JSON line format:
/// ```json
/// {"timestamp":"...","level":"INFO","fields":{"message":"...","checked":3},"target":"depwatch_core::pkg::outdated"}
/// ```
///
/// `RUST_LOG` is honored; the verbosity flag only raises depwatch's own targets.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Matches both the `depwatch` binary and `depwatch_core`.
    if let Ok(directive) = format!("depwatch={level}").parse() {
        filter = filter.add_directive(directive);
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
