//! Publish pipeline: bundle → remote catalog lookup → create or append-version.
//!
//! For each bundle this module:
//!   - reads the [`PackageConfig`] packed inside it
//!   - looks the package up by exact name in the account's script list
//!   - creates a new script listing when the name is unknown, or
//!   - appends a version to the existing script, refusing duplicates, then
//!     brings the listing's descriptive fields in line with the config.
//!
//! # Outcomes
//! Every bundle ends as [`PublishOutcome::Uploaded`], [`PublishOutcome::Updated`],
//! [`PublishOutcome::Skipped`] or an error. Bundles are processed one after the
//! other and a failure does not stop the rest of the batch, except a cancelled
//! prompt, which ends the run. Nothing already submitted is rolled back.
//!
//! # Callable From
//! - The CLI `publish` command, with the HTTP [`crate::site::VimOrgClient`]
//! - Tests, with `MockScriptSite` and `MockPrompter`

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::bundle;
use crate::config::{PackageConfig, CONFIG_FILENAME};
use crate::contract::{NewScript, NewVersion, Prompter, RemoteScript, ScriptDetails, ScriptSite};
use crate::error::{Result, VishopError};

#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Whether prompts may be shown. Updates require it.
    pub interactive: bool,
    /// Description given on the command line; wins over every other source.
    pub description: Option<String>,
    /// Name of the config entry inside each bundle.
    pub config_name: String,
    /// Directory searched for a `README*` fallback description.
    pub readme_dir: PathBuf,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            interactive: false,
            description: None,
            config_name: CONFIG_FILENAME.to_string(),
            readme_dir: PathBuf::from("."),
        }
    }
}

/// Result of the metadata sync that follows a version upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsSync {
    Unchanged,
    Synced,
    /// The sync failed; the version upload itself still stands.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Uploaded { url: String },
    Updated { url: String, details: DetailsSync },
    /// The user declined the upload.
    Skipped,
}

#[derive(Debug)]
pub struct FileReport {
    pub file: PathBuf,
    pub result: Result<PublishOutcome>,
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub files: Vec<FileReport>,
}

impl PublishReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// First regular `README*` file directly inside `dir`, by name order.
pub fn readme_from_dir(dir: &Path) -> Result<Option<String>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("README") && entry.file_type()?.is_file() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    match candidates.first() {
        Some(path) => {
            debug!(path = %path.display(), "Using README as description");
            Ok(Some(std::fs::read_to_string(path)?))
        }
        None => Ok(None),
    }
}

/// Publish every bundle in order and report per-file results.
pub async fn publish<S, P>(
    site: &mut S,
    prompter: &P,
    files: &[PathBuf],
    options: &PublishOptions,
) -> PublishReport
where
    S: ScriptSite + ?Sized,
    P: Prompter + ?Sized,
{
    info!(count = files.len(), "[PUBLISH] Starting publish run");
    let mut report = PublishReport::default();

    for file in files {
        let result = publish_file(site, prompter, file, options).await;
        let cancelled = matches!(result, Err(VishopError::Cancelled));
        match &result {
            Ok(outcome) => info!(file = %file.display(), ?outcome, "[PUBLISH] File done"),
            Err(e) => error!(file = %file.display(), error = %e, "[PUBLISH][ERROR] File failed"),
        }
        report.files.push(FileReport {
            file: file.clone(),
            result,
        });
        if cancelled {
            warn!("[PUBLISH] Cancelled by user, remaining files are not processed");
            break;
        }
    }
    report
}

/// Publish one bundle: create the script or append a version to it.
pub async fn publish_file<S, P>(
    site: &mut S,
    prompter: &P,
    file: &Path,
    options: &PublishOptions,
) -> Result<PublishOutcome>
where
    S: ScriptSite + ?Sized,
    P: Prompter + ?Sized,
{
    let config = bundle::config_from_bundle(file, &options.config_name)?;
    let account = site.fetch_account().await?;

    match account.find_script(&config.name) {
        Some(script) => {
            info!(name = %config.name, script_id = %script.id, "[PUBLISH] Script exists, appending version");
            update(site, prompter, file, &config, script, options).await
        }
        None => {
            info!(name = %config.name, "[PUBLISH] Script not found, creating it");
            create(site, prompter, file, &config, options).await
        }
    }
}

async fn create<S, P>(
    site: &mut S,
    prompter: &P,
    file: &Path,
    config: &PackageConfig,
    options: &PublishOptions,
) -> Result<PublishOutcome>
where
    S: ScriptSite + ?Sized,
    P: Prompter + ?Sized,
{
    let description = match options
        .description
        .clone()
        .or_else(|| config.description.clone())
    {
        Some(description) => description,
        None => readme_from_dir(&options.readme_dir)?.ok_or(VishopError::DescriptionRequired)?,
    };

    if options.interactive
        && !prompter.confirm(&format!("upload \"{}\"?", file.display()))?
    {
        info!(file = %file.display(), "[PUBLISH][CREATE] Upload declined");
        return Ok(PublishOutcome::Skipped);
    }

    let script = NewScript {
        name: config.name.clone(),
        script_type: config.script_type,
        vim_version: config.required.clone(),
        version: config.version.clone(),
        summary: config.summary.clone(),
        description,
        install_details: config.install_details.clone().unwrap_or_default(),
        archive: file.to_path_buf(),
    };
    let url = site.upload_script(&script).await?;
    info!(url = %url, "[PUBLISH][CREATE] Script uploaded");
    Ok(PublishOutcome::Uploaded { url })
}

/// Description for the metadata sync: explicit > config > bundle README > local README.
fn update_description(
    file: &Path,
    config: &PackageConfig,
    options: &PublishOptions,
) -> Result<String> {
    if let Some(description) = options
        .description
        .clone()
        .or_else(|| config.description.clone())
    {
        return Ok(description);
    }
    match bundle::readme_from_bundle(file) {
        Ok(readme) => return Ok(readme),
        Err(VishopError::MissingBundleEntry { .. }) => {}
        Err(e) => return Err(e),
    }
    readme_from_dir(&options.readme_dir)?.ok_or(VishopError::DescriptionRequired)
}

fn ask_version_comment<P>(prompter: &P) -> Result<String>
where
    P: Prompter + ?Sized,
{
    loop {
        let comment = prompter.input("version comment")?;
        if !comment.trim().is_empty() {
            return Ok(comment);
        }
        debug!("Empty version comment, asking again");
    }
}

async fn update<S, P>(
    site: &mut S,
    prompter: &P,
    file: &Path,
    config: &PackageConfig,
    script: &RemoteScript,
    options: &PublishOptions,
) -> Result<PublishOutcome>
where
    S: ScriptSite + ?Sized,
    P: Prompter + ?Sized,
{
    if !options.interactive {
        return Err(VishopError::NonInteractiveUpdate);
    }

    let versions = site.fetch_versions(&script.id).await?;
    debug!(?versions, "[PUBLISH][UPDATE] Remote versions");
    if versions.iter().any(|v| v == &config.version) {
        return Err(VishopError::DuplicateVersion {
            name: config.name.clone(),
            version: config.version.clone(),
        });
    }

    let comment = ask_version_comment(prompter)?;
    let new_version = NewVersion {
        script_id: script.id.clone(),
        vim_version: config.required.clone(),
        version: config.version.clone(),
        comment,
        archive: file.to_path_buf(),
    };
    let url = site.add_version(&new_version).await?;
    info!(url = %url, version = %config.version, "[PUBLISH][UPDATE] Version uploaded");

    let details = sync_details(site, file, config, &script.id, options).await;
    Ok(PublishOutcome::Updated { url, details })
}

/// Best-effort: push changed descriptive fields; never fails the update.
async fn sync_details<S>(
    site: &mut S,
    file: &Path,
    config: &PackageConfig,
    script_id: &str,
    options: &PublishOptions,
) -> DetailsSync
where
    S: ScriptSite + ?Sized,
{
    match try_sync_details(site, file, config, script_id, options).await {
        Ok(sync) => sync,
        Err(e) => {
            warn!(script_id, error = %e, "[PUBLISH][DETAILS] Details sync failed, version upload kept");
            DetailsSync::Failed(e.to_string())
        }
    }
}

async fn try_sync_details<S>(
    site: &mut S,
    file: &Path,
    config: &PackageConfig,
    script_id: &str,
    options: &PublishOptions,
) -> Result<DetailsSync>
where
    S: ScriptSite + ?Sized,
{
    let remote = site.fetch_details(script_id).await?;
    let wanted = ScriptDetails {
        name: config.name.clone(),
        summary: config.summary.clone(),
        description: update_description(file, config, options)?,
        install_details: config.install_details.clone().unwrap_or_default(),
    };
    if remote == wanted {
        debug!(script_id, "[PUBLISH][DETAILS] Details unchanged");
        return Ok(DetailsSync::Unchanged);
    }
    debug!(?remote, ?wanted, "[PUBLISH][DETAILS] Details differ");
    site.update_details(script_id, &wanted).await?;
    info!(script_id, "[PUBLISH][DETAILS] Script details updated");
    Ok(DetailsSync::Synced)
}
