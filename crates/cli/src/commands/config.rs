use offerkit_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use super::{CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(err) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                err.to_string(),
                EXIT_CONFIG,
                None,
            )
        }
    };

    let api_key = if config.has_api_key() { "[redacted]" } else { "" };
    let data = json!({
        "api": {
            "base_url": config.api.base_url,
            "api_key": api_key,
            "timeout_secs": config.api.timeout_secs,
            "max_read_retries": config.api.max_read_retries,
            "min_request_interval_ms": config.api.min_request_interval_ms,
        },
        "builder": {
            "honor_supplied_price": config.builder.honor_supplied_price,
            "service_requires_article": config.builder.service_requires_article,
        },
        "logging": {
            "level": config.logging.level,
            "format": config.logging.format,
        },
    });

    CommandResult::success("config", "effective configuration", Some(data))
}
