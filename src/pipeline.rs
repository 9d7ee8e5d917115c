#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, path::PathBuf};

use bon::Builder;

use crate::{
    drive::{DriveError, DriveFile, SubmissionSource},
    evaluate::{CompletionService, Evaluator},
    extract::TextExtractor,
    rubric::RubricRow,
    types::{EvaluationRecord, Submission},
};

/// Why a discovered file produced no report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be downloaded or read back.
    Download(String),
    /// The PDF could not be parsed.
    Extraction(String),
    /// The PDF parsed but contains no text.
    EmptyText,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Download(err) => write!(f, "download failed: {err}"),
            SkipReason::Extraction(err) => write!(f, "text extraction failed: {err}"),
            SkipReason::EmptyText => f.write_str("no text could be extracted"),
        }
    }
}

/// A file that was discovered but not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSubmission {
    /// Drive file name.
    pub file_name: String,
    /// What went wrong.
    pub reason:    SkipReason,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of files the listing returned.
    pub discovered: usize,
    /// One row per evaluated submission, in discovery order.
    pub records:    Vec<EvaluationRecord>,
    /// Files that produced no row.
    pub skipped:    Vec<SkippedSubmission>,
    /// How many of `records` carry the fallback verdict.
    pub fallbacks:  usize,
}

/// Sequences listing, download, extraction and evaluation for one folder.
#[derive(Builder)]
pub struct Pipeline<S, E, C> {
    /// Submission listing and download.
    source:       S,
    /// PDF to text.
    extractor:    E,
    /// Grading.
    evaluator:    Evaluator<C>,
    /// Where downloads land.
    #[builder(into)]
    download_dir: PathBuf,
}

impl<S, E, C> Pipeline<S, E, C>
where
    S: SubmissionSource,
    E: TextExtractor,
    C: CompletionService,
{
    /// Returns the evaluator.
    pub fn evaluator(&self) -> &Evaluator<C> {
        &self.evaluator
    }

    /// Processes every PDF in `folder_id`, one at a time, in listing order.
    ///
    /// Only a failed listing aborts the run; per-file failures are logged and
    /// collected in [`RunSummary::skipped`].
    pub async fn run(&self, folder_id: &str, rubric: &RubricRow) -> Result<RunSummary, DriveError> {
        let files = self.source.list_pdfs(folder_id).await?;
        tracing::info!("Found {} PDF file(s)", files.len());

        let mut summary = RunSummary {
            discovered: files.len(),
            ..Default::default()
        };

        for file in &files {
            tracing::info!("Processing {}...", file.name);
            match self.process(file, rubric).await {
                Ok((record, fallback)) => {
                    if fallback {
                        summary.fallbacks += 1;
                    }
                    summary.records.push(record);
                }
                Err(reason) => {
                    tracing::warn!("Skipping {}: {reason}", file.name);
                    summary.skipped.push(SkippedSubmission {
                        file_name: file.name.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Takes one file from `Discovered` to `Recorded`. The flag is true when
    /// the fallback verdict was used.
    async fn process(
        &self,
        file: &DriveFile,
        rubric: &RubricRow,
    ) -> Result<(EvaluationRecord, bool), SkipReason> {
        let path = self
            .source
            .download(file, &self.download_dir)
            .await
            .map_err(|e| SkipReason::Download(e.to_string()))?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SkipReason::Download(format!("{}: {e}", path.display())))?;

        let text = self
            .extractor
            .extract(&bytes)
            .map_err(|e| SkipReason::Extraction(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(SkipReason::EmptyText);
        }

        let submission = Submission::new(file.name.clone(), text);
        let evaluation = self.evaluator.evaluate(&submission, rubric).await;

        let record = EvaluationRecord::builder()
            .student_id(submission.student_id)
            .file_name(submission.file_name)
            .registration_id(evaluation.registration_id().unwrap_or_default())
            .student_name(evaluation.student_name().unwrap_or_default())
            .verdict(evaluation.verdict())
            .stage(rubric.stage().unwrap_or_default())
            .week(rubric.week().unwrap_or_default())
            .build();

        Ok((record, evaluation.is_fallback()))
    }
}
