#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use reqwest::Client;

use crate::constants::{
    DEFAULT_CREDENTIALS_PATH, DEFAULT_DOWNLOAD_DIR, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_REPORT_PATH, DEFAULT_RUBRIC_PATH,
    DEFAULT_TOKEN_PATH,
};

/// Local files and directories used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Rubric workbook or CSV.
    pub rubric:      PathBuf,
    /// Report destination; overwritten every run.
    pub report:      PathBuf,
    /// Directory receiving downloaded PDFs.
    pub downloads:   PathBuf,
    /// OAuth token cache.
    pub token:       PathBuf,
    /// OAuth client secrets.
    pub credentials: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            rubric:      DEFAULT_RUBRIC_PATH.into(),
            report:      DEFAULT_REPORT_PATH.into(),
            downloads:   DEFAULT_DOWNLOAD_DIR.into(),
            token:       DEFAULT_TOKEN_PATH.into(),
            credentials: DEFAULT_CREDENTIALS_PATH.into(),
        }
    }
}

/// Credentials and tuning for the language-model service.
#[derive(Clone)]
pub struct OpenAiSettings {
    /// API key used to authenticate requests.
    api_key:    String,
    /// Chat model identifier.
    model:      String,
    /// Alternative OpenAI-compatible endpoint, if any.
    api_base:   Option<String>,
    /// Completion token cap.
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiSettings {
    /// Settings with the default model and token cap.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key:    api_key.into(),
            model:      DEFAULT_MODEL.to_string(),
            api_base:   None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Reads `OPENAI_API_KEY` (required), `OPENAI_MODEL`, `OPENAI_ENDPOINT` and
    /// `OPENAI_MAX_TOKENS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OpenAiSettings::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let Some(api_key) = read("OPENAI_API_KEY") else {
            bail!("OPENAI_API_KEY is not set; add it to the environment or a .env file");
        };

        let mut settings = Self::new(api_key);
        if let Some(model) = read("OPENAI_MODEL") {
            settings.model = model;
        }
        settings.api_base = read("OPENAI_ENDPOINT");
        if let Some(raw) = read("OPENAI_MAX_TOKENS") {
            settings.max_tokens = raw
                .parse::<u32>()
                .with_context(|| format!("OPENAI_MAX_TOKENS must be a positive integer, got `{raw}`"))?;
        }

        Ok(settings)
    }

    /// Replaces the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points requests at another OpenAI-compatible endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Replaces the completion token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the endpoint override, if any.
    pub fn api_base(&self) -> Option<&str> {
        self.api_base.as_deref()
    }

    /// Returns the completion token cap.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Everything a run needs, resolved once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Local files.
    pub paths:        Paths,
    /// Language-model settings.
    pub openai:       OpenAiSettings,
    /// Timeout applied to every outgoing HTTP request.
    pub http_timeout: Duration,
}

impl Settings {
    /// Combines `paths` with settings read from the process environment.
    pub fn from_env(paths: Paths) -> Result<Self> {
        Self::from_lookup(paths, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an arbitrary variable source.
    pub fn from_lookup(paths: Paths, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let http_timeout = read_timeout_secs(
            lookup("TRILHA_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        );
        let openai = OpenAiSettings::from_lookup(lookup)?;
        Ok(Self {
            paths,
            openai,
            http_timeout,
        })
    }

    /// Builds the HTTP client shared by Drive, OAuth and the model service.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.http_timeout)
            .build()
            .context("Failed to construct shared HTTP client")
    }
}

/// Parses a number of seconds into a `Duration`, falling back to
/// `default_secs` when the value is missing, unparsable or zero.
fn read_timeout_secs(value: Option<String>, default_secs: u64) -> Duration {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
