use log::LevelFilter;

/// Initialize the logger from the verbosity flags.
///
/// `RUST_LOG`, when set, wins over the flags.
pub fn init_logger(verbosity: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Off
    } else {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    log::debug!("Logger initialized with level: {level:?}");
}
