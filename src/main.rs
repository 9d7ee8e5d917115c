#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # trilha
//!
//! Grades the PDFs in the Drive folder of the active challenge and writes
//! `avaliacoes.xlsx`.
//!
//! Runs with no arguments. Put `OPENAI_API_KEY` in the environment or a `.env`
//! file, keep `trilha_ia_desafios.xlsx` and `credentials.json` in the working
//! directory, and authorize Drive access in the browser on the first run.

use std::path::PathBuf;

use anyhow::Result;
use bpaf::*;
use dotenvy::dotenv;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};
use trilha::{
    config::{Paths, Settings},
    constants::{
        DEFAULT_CREDENTIALS_PATH, DEFAULT_DOWNLOAD_DIR, DEFAULT_REPORT_PATH, DEFAULT_RUBRIC_PATH,
        DEFAULT_TOKEN_PATH,
    },
    report::render_table,
};

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// File locations.
    paths:   Paths,
    /// Log at DEBUG instead of INFO.
    verbose: bool,
}

/// Parse the command line arguments and return an `Options` struct
fn options() -> Options {
    /// parses a path flag with an environment fallback and a default
    fn path(
        name: &'static str,
        env: &'static str,
        help: &'static str,
        default: &'static str,
    ) -> impl Parser<PathBuf> {
        long(name)
            .env(env)
            .help(help)
            .argument::<PathBuf>("PATH")
            .fallback(PathBuf::from(default))
            .debug_fallback()
    }

    let rubric = path("rubric", "TRILHA_RUBRIC", "Rubric spreadsheet (.xlsx or .csv)", DEFAULT_RUBRIC_PATH);
    let report = path("output", "TRILHA_OUTPUT", "Report file (.xlsx or .csv)", DEFAULT_REPORT_PATH);
    let downloads = path(
        "downloads",
        "TRILHA_DOWNLOADS",
        "Directory for downloaded PDFs",
        DEFAULT_DOWNLOAD_DIR,
    );
    let token = path("token", "TRILHA_TOKEN", "OAuth token cache", DEFAULT_TOKEN_PATH);
    let credentials = path(
        "credentials",
        "TRILHA_CREDENTIALS",
        "OAuth client secrets",
        DEFAULT_CREDENTIALS_PATH,
    );
    let paths = construct!(Paths {
        rubric,
        report,
        downloads,
        token,
        credentials
    });

    let verbose = short('v')
        .long("verbose")
        .help("Show debug output")
        .switch();

    construct!(Options { paths, verbose })
        .to_options()
        .descr("Grades PDF submissions against the active challenge")
        .run()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let settings = Settings::from_env(opts.paths)?;
    let summary = trilha::run(&settings).await?;

    println!("{}", render_table(&summary.records));
    tracing::info!(
        "{} found, {} evaluated ({} with the fallback verdict), {} skipped",
        summary.discovered,
        summary.records.len(),
        summary.fallbacks,
        summary.skipped.len()
    );
    for skipped in &summary.skipped {
        tracing::warn!("Not evaluated: {} ({})", skipped.file_name, skipped.reason);
    }

    Ok(())
}
