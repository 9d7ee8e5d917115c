//! # trilha
//!
//! Grades student PDF submissions stored in a Google Drive folder against the
//! active challenge of a rubric spreadsheet, using a language model, and
//! writes the verdicts to a report spreadsheet.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// OAuth token cache, refresh and first-time authorization
pub mod auth;
/// Runtime settings resolved from the environment
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Drive listing and download
pub mod drive;
/// Prompting the model and validating its reply
pub mod evaluate;
/// PDF text extraction
pub mod extract;
/// Per-file sequencing of a grading run
pub mod pipeline;
/// Report output
pub mod report;
/// Rubric loading and active-row selection
pub mod rubric;
/// Shared value types
pub mod types;

use anyhow::{Context, Result};
use auth::CredentialStore;
use config::Settings;
use drive::DriveClient;
use evaluate::{Evaluator, openai::OpenAiService};
use extract::PdfTextExtractor;
use pipeline::{Pipeline, RunSummary};

/// Runs a full grading pass and writes the report.
///
/// The rubric is resolved before anything touches the network, so a rubric
/// without an active row fails fast.
pub async fn run(settings: &Settings) -> Result<RunSummary> {
    let rubric = rubric::load_active_challenge(&settings.paths.rubric).with_context(|| {
        format!(
            "Could not find an active challenge. Check the rubric at {}",
            settings.paths.rubric.display()
        )
    })?;

    tracing::info!(
        "Active challenge: Etapa {}, Semana {}",
        rubric.stage().unwrap_or("N/A"),
        rubric.week().unwrap_or("N/A")
    );
    tracing::info!("Desafio: {}", rubric.challenge().unwrap_or("N/A"));
    tracing::debug!("Critérios: {}", rubric.criteria().unwrap_or("N/A"));

    let folder_id = rubric.folder_id().with_context(|| {
        format!(
            "The active challenge has no `{}` value",
            constants::FOLDER_COLUMN
        )
    })?;

    let http = settings.http_client()?;
    let credentials =
        CredentialStore::new(&settings.paths.token, &settings.paths.credentials, http.clone());
    let access_token = credentials
        .access_token()
        .await
        .context("Could not authorize Drive access")?;

    let pipeline = Pipeline::builder()
        .source(DriveClient::new(http.clone(), access_token))
        .extractor(PdfTextExtractor)
        .evaluator(Evaluator::new(OpenAiService::new(&settings.openai, http)))
        .download_dir(settings.paths.downloads.clone())
        .build();

    let summary = pipeline
        .run(folder_id, &rubric)
        .await
        .with_context(|| format!("Could not list submissions in folder {folder_id}"))?;

    report::write_report(&settings.paths.report, &summary.records).with_context(|| {
        format!("Could not write report to {}", settings.paths.report.display())
    })?;
    tracing::info!("Report written to {}", settings.paths.report.display());

    Ok(summary)
}
