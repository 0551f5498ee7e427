use std::process::ExitCode;

use offerkit_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use offerkit_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logging follows the effective config when it loads; commands report
    // config problems themselves, so a failure here falls back to defaults.
    let logging_config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    init_logging(&logging_config);

    offerkit_cli::run().await
}
