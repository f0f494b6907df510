//! # contract: the seams between the synchroniser and the outside world
//!
//! The publish logic talks to the remote site only through [`ScriptSite`] and
//! to the user only through [`Prompter`]. Real implementations live in
//! [`crate::site`] (HTTP + scraping) and in the CLI crate (terminal prompts);
//! tests use the `mockall` mocks generated here.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; with the `test-export-mocks`
//!   feature (on by default) `MockScriptSite` and `MockPrompter` are exported for
//!   integration tests of dependent crates.

use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::ScriptType;
use crate::error::Result;

/// One published script as listed on the account page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteScript {
    /// Numeric id assigned by the site.
    pub id: String,
    pub name: String,
    pub summary: String,
}

/// The account page: profile fields and the user's script contributions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountInfo {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub scripts: Vec<RemoteScript>,
}

impl AccountInfo {
    /// Exact-name lookup; a package name maps to at most one script.
    pub fn find_script(&self, name: &str) -> Option<&RemoteScript> {
        self.scripts.iter().find(|s| s.name == name)
    }
}

/// Descriptive fields of a script, as shown on its edit form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptDetails {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub install_details: String,
}

/// Everything the "upload new script" form needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScript {
    pub name: String,
    pub script_type: ScriptType,
    pub vim_version: String,
    pub version: String,
    pub summary: String,
    pub description: String,
    pub install_details: String,
    /// Bundle attached as `script_file`.
    pub archive: PathBuf,
}

/// Everything the "upload a new version" form needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub script_id: String,
    pub vim_version: String,
    pub version: String,
    pub comment: String,
    pub archive: PathBuf,
}

/// The remote plugin site, seen through its HTML forms.
///
/// Methods take `&mut self`: every call moves the session's referer and may
/// update its cookies.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ScriptSite: Send {
    /// Scrape the account page (profile and script list).
    async fn fetch_account(&mut self) -> Result<AccountInfo>;

    /// Version strings of a script, newest first as the site lists them.
    async fn fetch_versions(&mut self, script_id: &str) -> Result<Vec<String>>;

    /// Create a new script listing. Returns the URL the site redirected to.
    async fn upload_script(&mut self, script: &NewScript) -> Result<String>;

    /// Append a version to an existing script. Returns the redirect URL.
    async fn add_version(&mut self, version: &NewVersion) -> Result<String>;

    /// Scrape the edit form of a script.
    async fn fetch_details(&mut self, script_id: &str) -> Result<ScriptDetails>;

    /// Submit the edit form with new descriptive fields.
    async fn update_details(&mut self, script_id: &str, details: &ScriptDetails) -> Result<()>;
}

/// Interactive user input.
///
/// Implementations map an interrupted prompt to [`crate::VishopError::Cancelled`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Prompter: Send + Sync {
    fn input(&self, prompt: &str) -> Result<String>;

    /// Read a secret without echoing it.
    fn password(&self, prompt: &str) -> Result<String>;

    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Pick one of `items`, returning its index.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize>;
}
