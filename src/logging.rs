use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber, writing to stderr.
///
/// `COMPAT_CHECKR_LOG` takes an `EnvFilter` directive and wins over the
/// command-line verbosity. `COMPAT_CHECKR_LOG_FORMAT=json` switches to JSON
/// lines.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_env("COMPAT_CHECKR_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let format = std::env::var("COMPAT_CHECKR_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }
}

fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "compat_checkr=error,error";
    }
    match verbosity {
        0 => "compat_checkr=warn,warn",
        1 => "compat_checkr=info,warn",
        2 => "compat_checkr=debug,warn",
        _ => "compat_checkr=trace,info",
    }
}
