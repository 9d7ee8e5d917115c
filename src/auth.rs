#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! OAuth credentials for Drive access.
//!
//! A token cache (`token.json`) is read at startup. Fresh tokens are used as
//! is, expired ones are refreshed and written back, and when nothing usable
//! exists the installed-app flow runs against a loopback redirect using the
//! client secrets downloaded from the Google Cloud console.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use url::Url;
use uuid::Uuid;

use crate::constants::{
    CALLBACK_READ_TIMEOUT_SECS, DRIVE_SCOPE, GOOGLE_AUTH_URI, GOOGLE_TOKEN_URI,
    OAUTH_CALLBACK_TIMEOUT_SECS, TOKEN_EXPIRY_MARGIN_SECS,
};

/// Errors raised while obtaining an access token.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// A credential file could not be read or written.
    #[error("Could not access {}", .path.display())]
    Io {
        /// file location
        path:   PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// A credential file is not valid JSON of the expected shape.
    #[error("Could not parse {}: {source}", .path.display())]
    Json {
        /// file location
        path:   PathBuf,
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
    /// No usable token and nothing to run the authorization flow with.
    #[error("No usable token and no client secrets at {}", .0.display())]
    MissingSecrets(PathBuf),
    /// The token endpoint could not be reached or answered garbage.
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The token endpoint rejected the request.
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint {
        /// HTTP status code
        status: u16,
        /// response body
        body:   String,
    },
    /// The browser redirect did not carry an authorization code.
    #[error("Authorization callback failed: {0}")]
    Callback(String),
    /// A callback arrived with a `state` other than the one this flow issued.
    #[error("Authorization callback carried an unexpected `state`")]
    StateMismatch,
    /// No callback arrived in time.
    #[error("No authorization callback received within {} seconds", .0.as_secs())]
    CallbackTimeout(Duration),
}

/// Default for [`StoredToken::token_uri`] and [`ClientSecrets::token_uri`].
fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Default for [`ClientSecrets::auth_uri`].
fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

/// Persisted OAuth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token sent to Drive.
    pub access_token:  String,
    /// Long-lived token used to mint new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When `access_token` stops working. Unknown means "assume valid".
    #[serde(default)]
    pub expires_at:    Option<DateTime<Utc>>,
    /// OAuth client id.
    pub client_id:     String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Endpoint used for refreshes.
    #[serde(default = "default_token_uri")]
    pub token_uri:     String,
    /// Granted scopes.
    #[serde(default)]
    pub scopes:        Vec<String>,
}

impl StoredToken {
    /// Whether the access token can still be used at `now`, leaving a small
    /// margin before expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => {
                now.checked_add_signed(TimeDelta::seconds(TOKEN_EXPIRY_MARGIN_SECS))
                    .is_some_and(|deadline| expiry > deadline)
            }
            None => true,
        }
    }

    /// Folds a token endpoint response into this token.
    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        // Out-of-range lifetimes leave the expiry unknown.
        self.expires_at = response
            .expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

/// OAuth client registration, as found under `installed` (or `web`) in a
/// downloaded `credentials.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client id.
    pub client_id:     String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Consent page.
    #[serde(default = "default_auth_uri")]
    pub auth_uri:      String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri:     String,
}

/// Outer shape of the secrets file.
#[derive(Deserialize)]
struct SecretsFile {
    /// Desktop-app client.
    installed: Option<ClientSecrets>,
    /// Web-app client.
    web:       Option<ClientSecrets>,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// New access token.
    access_token:  String,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in:    Option<i64>,
    /// Only sent on the first exchange or on rotation.
    #[serde(default)]
    refresh_token: Option<String>,
    /// Space separated scopes.
    #[serde(default)]
    scope:         Option<String>,
}

/// Reads, refreshes and persists Drive credentials.
pub struct CredentialStore {
    /// Token cache location.
    token_path:   PathBuf,
    /// Client secrets location.
    secrets_path: PathBuf,
    /// Client used for token endpoint calls.
    http:         reqwest::Client,
}

impl CredentialStore {
    /// Creates a store over the given token cache and secrets file.
    pub fn new(
        token_path: impl Into<PathBuf>,
        secrets_path: impl Into<PathBuf>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            secrets_path: secrets_path.into(),
            http,
        }
    }

    /// Reads the cached token, returning `None` when the cache does not exist.
    pub async fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AuthError::Io {
                    path: self.token_path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| AuthError::Json {
                path: self.token_path.clone(),
                source,
            })
    }

    /// Overwrites the token cache.
    pub async fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        let body = serde_json::to_string_pretty(token).map_err(|source| AuthError::Json {
            path: self.token_path.clone(),
            source,
        })?;
        tokio::fs::write(&self.token_path, body)
            .await
            .map_err(|source| AuthError::Io {
                path: self.token_path.clone(),
                source,
            })
    }

    /// Reads the client secrets file.
    pub async fn load_secrets(&self) -> Result<ClientSecrets, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.secrets_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::MissingSecrets(self.secrets_path.clone()));
            }
            Err(source) => {
                return Err(AuthError::Io {
                    path: self.secrets_path.clone(),
                    source,
                });
            }
        };
        parse_secrets(&raw, &self.secrets_path)
    }

    /// Returns a usable access token, refreshing or authorizing as needed and
    /// persisting whatever changed.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let cached = self.load().await?;

        let token = match cached {
            Some(token) if token.is_fresh(Utc::now()) => {
                tracing::debug!("Using cached Drive token");
                return Ok(token.access_token);
            }
            Some(token) if token.refresh_token.is_some() => {
                tracing::info!("Refreshing Drive token");
                match self.refresh(&token).await {
                    Ok(token) => token,
                    Err(AuthError::TokenEndpoint { status, body }) => {
                        tracing::warn!(
                            "Refresh rejected ({status}): {body}. Starting a new authorization."
                        );
                        self.authorize().await?
                    }
                    Err(err) => return Err(err),
                }
            }
            _ => self.authorize().await?,
        };

        self.save(&token).await?;
        Ok(token.access_token)
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = token.refresh_token.as_deref().unwrap_or_default();
        let response = self
            .request_token(
                &token.token_uri,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", token.client_id.as_str()),
                    ("client_secret", token.client_secret.as_str()),
                ],
            )
            .await?;

        let mut refreshed = token.clone();
        refreshed.apply(response, Utc::now());
        Ok(refreshed)
    }

    /// Runs the installed-app flow: prints the consent URL, waits for the
    /// browser to hit the loopback redirect, and exchanges the code.
    async fn authorize(&self) -> Result<StoredToken, AuthError> {
        let secrets = self.load_secrets().await?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::Callback(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Callback(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}");
        let state = Uuid::new_v4().to_string();
        let consent = consent_url(&secrets, &redirect_uri, &state)?;

        println!("Open this URL in a browser to authorize Drive access:\n\n{consent}\n");
        let code = wait_for_code(
            &listener,
            &state,
            Duration::from_secs(OAUTH_CALLBACK_TIMEOUT_SECS),
        )
        .await?;

        let response = self
            .request_token(
                &secrets.token_uri,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                ],
            )
            .await?;

        let mut token = StoredToken {
            access_token:  String::new(),
            refresh_token: None,
            expires_at:    None,
            client_id:     secrets.client_id,
            client_secret: secrets.client_secret,
            token_uri:     secrets.token_uri,
            scopes:        vec![DRIVE_SCOPE.to_string()],
        };
        token.apply(response, Utc::now());
        tracing::info!("Drive access authorized");
        Ok(token)
    }

    /// Posts a form to the token endpoint.
    async fn request_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self.http.post(token_uri).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

/// Parses a downloaded `credentials.json`.
pub fn parse_secrets(raw: &str, path: &Path) -> Result<ClientSecrets, AuthError> {
    let file: SecretsFile = serde_json::from_str(raw).map_err(|source| AuthError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    file.installed
        .or(file.web)
        .ok_or_else(|| AuthError::MissingSecrets(path.to_path_buf()))
}

/// Builds the consent page URL for the read-only Drive scope. `state` is
/// echoed back on the redirect and checked by [`parse_callback`].
pub fn consent_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", DRIVE_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::Callback(format!("invalid auth_uri `{}`: {e}", secrets.auth_uri)))
}

/// Looks for the authorization outcome in a request target such as
/// `/?code=abc&state=...&scope=...`.
///
/// Returns `Ok(None)` for unrelated requests (a favicon, say). A request that
/// carries a code or an error must also carry `expected_state`; anything else
/// fails with [`AuthError::StateMismatch`].
pub fn parse_callback(target: &str, expected_state: &str) -> Result<Option<String>, AuthError> {
    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| AuthError::Callback(e.to_string()))?;

    let mut code = None;
    let mut error = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if code.is_none() && error.is_none() {
        return Ok(None);
    }
    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    match error {
        Some(error) => Err(AuthError::Callback(error)),
        None => Ok(code),
    }
}

/// Accepts loopback connections until one carries the authorization code for
/// `expected_state`, giving up after `deadline`.
///
/// Connections that stay silent are dropped after a few seconds, and
/// callbacks with a foreign `state` are answered with an error page and
/// ignored.
pub async fn wait_for_code(
    listener: &TcpListener,
    expected_state: &str,
    deadline: Duration,
) -> Result<String, AuthError> {
    tokio::time::timeout(deadline, accept_callbacks(listener, expected_state))
        .await
        .map_err(|_| AuthError::CallbackTimeout(deadline))?
}

/// The unbounded loop behind [`wait_for_code`].
async fn accept_callbacks(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    let read_timeout = Duration::from_secs(CALLBACK_READ_TIMEOUT_SECS);

    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| AuthError::Callback(e.to_string()))?;

        let Ok(request) = tokio::time::timeout(read_timeout, read_request_head(&mut stream)).await
        else {
            tracing::debug!("Dropping idle callback connection");
            continue;
        };
        let Ok(request) = request else {
            continue;
        };

        let target = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/");

        let outcome = parse_callback(target, expected_state);
        let (status, body) = match &outcome {
            Ok(Some(_)) => ("200 OK", "Autorização concluída. Você pode fechar esta janela."),
            Ok(None) => ("404 Not Found", ""),
            Err(_) => ("400 Bad Request", "A autorização falhou. Verifique o terminal."),
        };
        let reply = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: \
             {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(reply.as_bytes()).await;
        let _ = stream.shutdown().await;

        match outcome {
            Ok(Some(code)) => return Ok(code),
            Ok(None) => {}
            Err(AuthError::StateMismatch) => {
                tracing::warn!("Ignoring authorization callback with an unexpected state");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Reads until the end of the HTTP request head, or 8 KiB.
async fn read_request_head(stream: &mut tokio::net::TcpStream) -> std::io::Result<String> {
    let mut buf = vec![0u8; 8192];
    let mut filled = 0;
    while filled < buf.len() {
        let read = stream.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
        if buf[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf[..filled]).into_owned())
}
