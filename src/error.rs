use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelpdeskError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No API URL configured. Set HELPDESK_API_URL or run 'helpdesk init'")]
    MissingApiUrl,

    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Not signed in. Run 'helpdesk sign-in <username>' first")]
    NotSignedIn,

    #[error("Sign-in response did not contain an access token")]
    NoAccessToken,

    #[error("No user id could be resolved from the current session")]
    NoUserId,

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Could not load tickets for the current session")]
    TicketsUnavailable,

    #[error("The backend did not confirm the update")]
    UpdateNotConfirmed,

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Catalog entry not found: {0}")]
    CatalogEntryNotFound(String),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HelpdeskError>;
