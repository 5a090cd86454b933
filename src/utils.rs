use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_log() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
