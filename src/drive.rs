#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::constants::{DRIVE_API_BASE, DRIVE_PAGE_SIZE, PDF_MIME_TYPE};

/// Errors raised while talking to Drive.
#[derive(thiserror::Error, Debug)]
pub enum DriveError {
    /// Drive could not be reached or sent an unreadable body.
    #[error("Drive request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Drive answered with a non-success status.
    #[error("Drive returned {status} for {what}: {body}")]
    Status {
        /// what was being requested
        what:   String,
        /// HTTP status code
        status: u16,
        /// response body
        body:   String,
    },
    /// The downloaded bytes could not be written locally.
    #[error("Could not write {}", .path.display())]
    Io {
        /// destination file
        path:   PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
}

/// A file entry from `files.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file id.
    pub id:           String,
    /// File name, as uploaded.
    pub name:         String,
    /// Upload time, when Drive reports it.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
}

/// One page of `files.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    /// Entries on this page.
    #[serde(default)]
    files:           Vec<DriveFile>,
    /// Cursor for the next page, absent on the last one.
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Where submissions come from.
pub trait SubmissionSource {
    /// Lists every PDF directly inside `folder_id`, in the order the backend
    /// returns them.
    fn list_pdfs(&self, folder_id: &str) -> impl Future<Output = Result<Vec<DriveFile>, DriveError>>;

    /// Stores `file` under `dest_dir` and returns the local path.
    fn download(
        &self,
        file: &DriveFile,
        dest_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf, DriveError>>;
}

/// Minimal Drive v3 REST client.
#[derive(Clone)]
pub struct DriveClient {
    /// Shared HTTP client; carries the request timeout.
    http:         reqwest::Client,
    /// API root, overridable for tests.
    base_url:     String,
    /// OAuth bearer token.
    access_token: String,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoint.
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self::with_base_url(http, DRIVE_API_BASE, access_token)
    }

    /// Creates a client against an arbitrary API root.
    pub fn with_base_url(
        http: reqwest::Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Turns a non-success response into [`DriveError::Status`].
    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, DriveError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DriveError::Status {
            what: what.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

impl SubmissionSource for DriveClient {
    async fn list_pdfs(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = folder_query(folder_id);
        let page_size = DRIVE_PAGE_SIZE.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", "nextPageToken, files(id, name, createdTime)"),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .http
                .get(format!("{}/files", self.base_url))
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .await?;
            let page: FileList = Self::check(response, "file listing")
                .await?
                .json()
                .await?;

            tracing::debug!("Listed {} file(s) in folder {folder_id}", page.files.len());
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn download(&self, file: &DriveFile, dest_dir: &Path) -> Result<PathBuf, DriveError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| DriveError::Io {
                path: dest_dir.to_path_buf(),
                source,
            })?;
        let path = dest_dir.join(sanitize_file_name(&file.name));

        let response = self
            .http
            .get(format!("{}/files/{}", self.base_url, file.id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let mut response = Self::check(response, &file.name).await?;

        let total = response.content_length();
        let io_err = |source| DriveError::Io {
            path: path.clone(),
            source,
        };
        let mut out = tokio::fs::File::create(&path).await.map_err(io_err)?;
        let mut received: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await.map_err(io_err)?;
            received += chunk.len() as u64;
            match total {
                Some(total) if total > 0 => tracing::debug!(
                    "Download {}% complete: {}",
                    received * 100 / total,
                    file.name
                ),
                _ => tracing::debug!("Downloaded {received} bytes: {}", file.name),
            }
        }
        out.flush().await.map_err(io_err)?;

        tracing::info!("Downloaded {} ({received} bytes)", file.name);
        Ok(path)
    }
}

/// Drive search expression for PDFs directly inside `folder_id`.
pub fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and mimeType='{PDF_MIME_TYPE}' and trashed=false")
}

/// Makes a Drive file name safe to join onto a local directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "submission.pdf".to_string()
    } else {
        cleaned
    }
}
