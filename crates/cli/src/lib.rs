pub mod commands;
pub mod workbook;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use offerkit_core::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "offerkit",
    about = "Spreadsheet-to-quotation connector CLI",
    long_about = "Validate quote workbooks, submit them to the remote quotation API, \
                  and inspect effective configuration.",
    after_help = "Examples:\n  offerkit validate angebot.xlsx --offline\n  offerkit submit angebot.xlsx\n  offerkit config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Validate a quote workbook and report every error with sheet/row/field attribution"
    )]
    Validate {
        file: PathBuf,
        #[arg(long, help = "Honor spreadsheet-supplied prices on rows that also carry an articleId")]
        honor_supplied_prices: bool,
        #[arg(long, help = "Require an articleId on service rows")]
        require_service_article: bool,
        #[arg(long, help = "Validate without remote catalog lookups")]
        offline: bool,
    },
    #[command(about = "Validate, submit to the remote API, and fetch the document reference")]
    Submit {
        file: PathBuf,
        #[arg(long, help = "Honor spreadsheet-supplied prices on rows that also carry an articleId")]
        honor_supplied_prices: bool,
        #[arg(long, help = "Require an articleId on service rows")]
        require_service_article: bool,
        #[arg(long, help = "Skip document rendering after creation")]
        no_document: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
}

fn policy_overrides(honor_supplied_prices: bool, require_service_article: bool) -> ConfigOverrides {
    ConfigOverrides {
        honor_supplied_price: honor_supplied_prices.then_some(true),
        service_requires_article: require_service_article.then_some(true),
        ..ConfigOverrides::default()
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate { file, honor_supplied_prices, require_service_article, offline } => {
            commands::validate::run(
                &file,
                policy_overrides(honor_supplied_prices, require_service_article),
                offline,
            )
            .await
        }
        Command::Submit { file, honor_supplied_prices, require_service_article, no_document } => {
            commands::submit::run(
                &file,
                policy_overrides(honor_supplied_prices, require_service_article),
                no_document,
            )
            .await
        }
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
