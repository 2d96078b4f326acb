use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use vitrine_core::config::{AppConfig, LoadOptions, LogFormat};

fn main() -> ExitCode {
    init_tracing();
    vitrine_cli::run()
}

fn init_tracing() {
    // Logging config is best-effort here; a broken config file still gets
    // a usable compact subscriber and the command reports the real error.
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
