use env_logger::Env;

/// Installs the process logger. `RUST_LOG` overrides the `info` default.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Logger for tests; repeated calls are harmless.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
