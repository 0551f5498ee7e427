use std::path::Path;

use offerkit_api::QuotationApi;
use offerkit_core::builder::{BuildOutcome, BuilderPolicy, QuotationBuilder};
use offerkit_core::catalog::OfflineArticleLookup;
use offerkit_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use super::{CommandResult, EXIT_CONFIG, EXIT_VALIDATION, EXIT_WORKBOOK};
use crate::workbook;

pub async fn run(file: &Path, overrides: ConfigOverrides, offline: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(err) => {
            return CommandResult::failure(
                "validate",
                "config_validation",
                err.to_string(),
                EXIT_CONFIG,
                None,
            )
        }
    };

    let input = match workbook::load_workbook(file) {
        Ok(input) => input,
        Err(err) => {
            return CommandResult::failure(
                "validate",
                "workbook_read",
                format!("{err:#}"),
                EXIT_WORKBOOK,
                None,
            )
        }
    };

    let policy = BuilderPolicy {
        honor_supplied_price: config.builder.honor_supplied_price,
        service_requires_article: config.builder.service_requires_article,
    };

    let outcome = if offline || !config.has_api_key() {
        let lookup = OfflineArticleLookup;
        QuotationBuilder::new(&lookup, policy).build(&input).await
    } else {
        let api = match QuotationApi::new(&config.api) {
            Ok(api) => api,
            Err(err) => {
                return CommandResult::failure(
                    "validate",
                    "api_client",
                    err.to_string(),
                    EXIT_CONFIG,
                    None,
                )
            }
        };
        QuotationBuilder::new(&api, policy).build(&input).await
    };

    report(outcome)
}

fn report(outcome: BuildOutcome) -> CommandResult {
    let data = serde_json::to_value(&outcome).ok();
    if outcome.summary.is_ok() {
        let line_items = outcome
            .payload
            .as_ref()
            .map(|payload| payload.line_items.len())
            .unwrap_or_default();
        CommandResult::success(
            "validate",
            format!("workbook is valid ({line_items} line items)"),
            data,
        )
    } else {
        CommandResult::failure(
            "validate",
            "validation",
            format!("{} validation error(s)", outcome.summary.errors.len()),
            EXIT_VALIDATION,
            data,
        )
    }
}
