use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
///
/// The caller provides a fallback filter string that is used when `RUST_LOG` is
/// not set. `LOG_FORMAT=compact` switches to the single-line compact formatter.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    crate::util::env::init_env();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true);

    let compact = crate::util::env::env_opt("LOG_FORMAT")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("compact"));
    let result = if compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
