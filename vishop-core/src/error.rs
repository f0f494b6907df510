//! Error taxonomy shared by the builder and the synchroniser.
//!
//! Every failure is raised where it is detected and surfaced unmodified; nothing
//! in this crate retries. The remote site is scraped, so a retried form post can
//! produce a duplicate submission.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, VishopError>;

#[derive(Debug, thiserror::Error)]
pub enum VishopError {
    /// Missing or invalid package configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("\"{}\" is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("\"{}\" is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("at least 1 file required: every collected file was excluded")]
    EmptyBundle,

    #[error("file \"{}\" is not a supported bundle type", .0.display())]
    UnsupportedBundle(PathBuf),

    #[error("cannot find \"{pattern}\" in bundle \"{}\"", bundle.display())]
    MissingBundleEntry { bundle: PathBuf, pattern: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("credentials required: {0}")]
    Credential(String),

    #[error("authentication failed")]
    Authentication,

    #[error("maximum quota exceeded: {0}")]
    RateLimit(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The remote page no longer has the shape the scraper expects.
    #[error("unexpected page structure: {0}")]
    Scrape(String),

    /// An error message rendered by the remote site itself.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("cannot update script \"{name}\": version '{version}' already exists")]
    DuplicateVersion { name: String, version: String },

    #[error("description required: pass --description, set it in the config or add a README")]
    DescriptionRequired,

    #[error("update must run in interactive mode: a version comment is required")]
    NonInteractiveUpdate,

    #[error("uploading script failed with status {0}")]
    UploadFailed(u16),

    #[error("uploading new version failed with status {0}")]
    UpdateFailed(u16),

    #[error("updating script details failed with status {0}")]
    DetailsUpdateFailed(u16),

    #[error("cancel")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl From<zip::result::ZipError> for VishopError {
    fn from(e: zip::result::ZipError) -> Self {
        VishopError::Archive(e.to_string())
    }
}

impl From<serde_json::Error> for VishopError {
    fn from(e: serde_json::Error) -> Self {
        VishopError::Config(e.to_string())
    }
}
