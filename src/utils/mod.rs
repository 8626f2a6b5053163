pub mod build_info;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "homefin=info";

/// Initializes the global tracing subscriber from `RUST_LOG` (or
/// [`DEFAULT_LOG_DIRECTIVE`]), adding `directive` from the config's `log_filter` on top.
/// Invalid directives are ignored. Logs go to stderr so scripted output on stdout stays
/// clean.
pub fn init_tracing_with(directive: Option<&str>) {
    TRACING_INIT.call_once(|| {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
        if let Some(parsed) = directive.and_then(|raw| raw.parse().ok()) {
            filter = filter.add_directive(parsed);
        }
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
