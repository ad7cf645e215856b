use tracing_subscriber::EnvFilter;

/// Initialise logging to stderr; stdout carries the surface protocol.
///
/// The default level is `info`. With `debug` set the level is `debug` and
/// `RUST_LOG` may override it.
pub fn init(debug: bool) {
    // Without debug, `RUST_LOG` is ignored so a stray variable in the user's
    // environment cannot flood the log.
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
