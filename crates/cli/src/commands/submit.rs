use std::path::Path;

use chrono::Utc;
use offerkit_api::{ApiError, QuotationApi};
use offerkit_core::builder::{BuilderPolicy, QuotationBuilder};
use offerkit_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{CommandResult, EXIT_CONFIG, EXIT_REMOTE, EXIT_VALIDATION, EXIT_WORKBOOK};
use crate::workbook;

pub async fn run(file: &Path, overrides: ConfigOverrides, no_document: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(err) => {
            return CommandResult::failure(
                "submit",
                "config_validation",
                err.to_string(),
                EXIT_CONFIG,
                None,
            )
        }
    };
    if !config.has_api_key() {
        return CommandResult::failure(
            "submit",
            "config_validation",
            "api.api_key is required for submit",
            EXIT_CONFIG,
            None,
        );
    }

    let input = match workbook::load_workbook(file) {
        Ok(input) => input,
        Err(err) => {
            return CommandResult::failure(
                "submit",
                "workbook_read",
                format!("{err:#}"),
                EXIT_WORKBOOK,
                None,
            )
        }
    };

    let api = match QuotationApi::new(&config.api) {
        Ok(api) => api,
        Err(err) => {
            return CommandResult::failure("submit", "api_client", err.to_string(), EXIT_CONFIG, None)
        }
    };

    let policy = BuilderPolicy {
        honor_supplied_price: config.builder.honor_supplied_price,
        service_requires_article: config.builder.service_requires_article,
    };
    let correlation_id = Uuid::new_v4().to_string();

    let outcome = QuotationBuilder::new(&api, policy).build(&input).await;
    if !outcome.summary.is_ok() {
        let data = serde_json::to_value(&outcome).ok();
        return CommandResult::failure(
            "submit",
            "validation",
            format!("{} validation error(s), nothing was submitted", outcome.summary.errors.len()),
            EXIT_VALIDATION,
            data,
        );
    }
    let Some(payload) = outcome.payload else {
        return CommandResult::failure(
            "submit",
            "validation",
            "validation produced no payload",
            EXIT_VALIDATION,
            None,
        );
    };

    info!(
        event_name = "cli.submit.start",
        correlation_id = %correlation_id,
        line_item_count = payload.line_items.len(),
        "submitting validated quotation"
    );

    let created = match api.create_quotation(&payload).await {
        Ok(created) => created,
        // A rate-limited creation is never retried here: the remote call is
        // not idempotent and a retry could create a duplicate voucher.
        Err(ApiError::RateLimited) => {
            return CommandResult::failure(
                "submit",
                "rate_limited",
                "remote API rate limit reached, submission was not retried",
                EXIT_REMOTE,
                None,
            )
        }
        Err(err) => {
            return CommandResult::failure("submit", "remote", err.to_string(), EXIT_REMOTE, None)
        }
    };

    info!(
        event_name = "cli.submit.created",
        correlation_id = %correlation_id,
        quotation_id = %created.id,
        "quotation created"
    );

    let mut data = json!({
        "quotationId": created.id,
        "resourceUri": created.resource_uri,
        "correlationId": correlation_id,
        "submittedAt": Utc::now().to_rfc3339(),
        "warnings": outcome.summary.warnings,
    });

    if no_document {
        return CommandResult::success("submit", "quotation created", Some(data));
    }

    match api.render_document(&created.id).await {
        Ok(document) => {
            data["documentFileId"] = json!(document.document_file_id);
            CommandResult::success("submit", "quotation created and document rendered", Some(data))
        }
        // The quotation exists at this point; surface its id even though the
        // document fetch failed.
        Err(err) => CommandResult::failure(
            "submit",
            "document",
            format!("quotation created but document retrieval failed: {err}"),
            EXIT_REMOTE,
            Some(data),
        ),
    }
}
