//! Log output setup.
//!
//! The workspace crates log through the `log` facade; those records are
//! bridged into the `tracing` subscriber installed here.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber writing to stderr.
///
/// `verbose` forces debug level; otherwise `RUST_LOG` applies, defaulting to
/// `info`. Calling this twice is harmless.
pub fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("kp2bw: logging already initialised ({})", e);
    }
}
