pub mod shutdown;

/// Initializes process-wide logging and terminal color support.
///
/// Call once near the top of `main`, before touching sockets or the
/// credential store.
pub fn init() {
    let disable_colors = std::env::var("DISABLE_COLORS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    owo_colors::set_override(!disable_colors);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
