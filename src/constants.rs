#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Rubric column holding the stage number.
pub const STAGE_COLUMN: &str = "Etapa";

/// Rubric column holding the week number.
pub const WEEK_COLUMN: &str = "Semana";

/// Rubric column holding the challenge statement.
pub const CHALLENGE_COLUMN: &str = "Desafio";

/// Rubric column holding the grading criteria.
pub const CRITERIA_COLUMN: &str = "Critérios";

/// Rubric column flagging the challenge currently in effect.
pub const ACTIVE_COLUMN: &str = "Atual";

/// Rubric column with the Drive folder that receives submissions.
pub const FOLDER_COLUMN: &str = "Directory_Key";

/// Columns every rubric source must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    STAGE_COLUMN,
    WEEK_COLUMN,
    CHALLENGE_COLUMN,
    CRITERIA_COLUMN,
    ACTIVE_COLUMN,
];

/// Cell value marking the active row. Compared case-sensitively.
pub const ACTIVE_MARKER: &str = "x";

/// Header row of the generated report. `ra` and `nome` always come last.
pub const REPORT_COLUMNS: [&str; 7] =
    ["aluno", "arquivo", "avaliacao", "etapa", "semana", "ra", "nome"];

/// Submission text longer than this (in characters) is cut before prompting.
pub const PROMPT_TRUNCATE: usize = 24_000;

/// Default cap on completion tokens; enough for the three-key JSON answer.
pub const DEFAULT_MAX_TOKENS: u32 = 120;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default request timeout for every HTTP client, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Read-only Drive scope requested during authorization.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Drive v3 REST root.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// MIME type of the documents collected from the folder.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Page size requested from `files.list`.
pub const DRIVE_PAGE_SIZE: u32 = 100;

/// Google's OAuth token endpoint, used when the secrets file omits one.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google's OAuth consent endpoint, used when the secrets file omits one.
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Tokens closer than this to expiry are refreshed before use.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// How long the loopback listener waits for the browser redirect.
pub const OAUTH_CALLBACK_TIMEOUT_SECS: u64 = 300;

/// How long an accepted loopback connection may stay silent.
pub const CALLBACK_READ_TIMEOUT_SECS: u64 = 5;

/// Default rubric workbook.
pub const DEFAULT_RUBRIC_PATH: &str = "trilha_ia_desafios.xlsx";

/// Default report file.
pub const DEFAULT_REPORT_PATH: &str = "avaliacoes.xlsx";

/// Default directory for downloaded PDFs.
pub const DEFAULT_DOWNLOAD_DIR: &str = "pdf_downloads";

/// Default OAuth token cache.
pub const DEFAULT_TOKEN_PATH: &str = "token.json";

/// Default OAuth client secrets file.
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
