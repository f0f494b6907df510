//! Command handlers behind [`crate::cli::run`].

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vishop_core::bundle::write_bundle;
use vishop_core::collect::{FileCollector, FileSet};
use vishop_core::config::CONFIG_FILENAME;
use vishop_core::contract::{AccountInfo, Prompter, ScriptSite};
use vishop_core::pattern::{read_ignore_file, ExcludeFilter};
use vishop_core::publish::{publish as publish_bundles, DetailsSync, PublishOptions, PublishOutcome, PublishReport};
use vishop_core::session::authenticate;
use vishop_core::site::VimOrgClient;
use vishop_core::VishopError;

use crate::cli::{BuildArgs, CleanArgs, InitArgs, LoginArgs, PublishArgs};
use crate::init::{build_config, write_config, InitFields};
use crate::load_config::{load_config, resolve_base_url, resolve_password, resolve_username};
use crate::prompt::{stdin_is_interactive, TerminalPrompter};

pub fn init(config_path: &Path, args: InitArgs) -> Result<()> {
    let output = args.output.unwrap_or_else(|| config_path.to_path_buf());
    let interactive = stdin_is_interactive();
    let prompter = TerminalPrompter;

    if output.exists()
        && !(interactive
            && prompter.confirm(&format!("\"{}\" exists. overwrite it?", output.display()))?)
    {
        bail!("{} already exists", output.display());
    }

    let fields = InitFields {
        name: args.name,
        script_type: args.script_type,
        required: args.required,
        version: args.version,
        summary: args.summary,
        description: args.description,
        install_details: args.install_details,
        private: args.private,
    };
    let config = build_config(fields, interactive, &prompter)?;
    write_config(&config, &output)?;
    println!("Config written to {}", output.display());
    Ok(())
}

/// Log into the site with credentials from flags, environment or prompts.
async fn login(args: &LoginArgs, prompter: &TerminalPrompter) -> Result<VimOrgClient> {
    let credentials = authenticate(
        resolve_username(args.username.clone()),
        resolve_password(args.password.clone()),
        args.interactive(),
        prompter,
    )?;
    let mut client = VimOrgClient::new(&resolve_base_url(args.base_url.clone()))?;
    client.login(&credentials).await?;
    Ok(client)
}

pub fn format_account(account: &AccountInfo) -> String {
    let mut out = format!(
        "user name: {}\nfirst name: {}\nlast name: {}\nemail: {}\nscripts:\n",
        account.user_name, account.first_name, account.last_name, account.email
    );
    for script in &account.scripts {
        out.push_str(&format!("  {}: {}\n", script.name, script.summary));
    }
    out
}

pub async fn info(args: LoginArgs) -> Result<()> {
    let prompter = TerminalPrompter;
    let mut client = login(&args, &prompter).await?;
    let account = client.fetch_account().await?;
    print!("{}", format_account(&account));
    Ok(())
}

/// Exclude patterns for a build: config, then flags, then ignore files.
pub fn gather_excludes(config_excludes: &[String], args: &BuildArgs) -> Result<Vec<String>> {
    let mut excludes: Vec<String> = config_excludes.to_vec();
    excludes.extend(args.exclude.iter().cloned());
    for ignore_file in &args.ignore_file {
        if !ignore_file.is_file() {
            debug!(path = %ignore_file.display(), "Ignore file not found, skipping");
            continue;
        }
        excludes.extend(read_ignore_file(ignore_file)?);
    }
    Ok(excludes)
}

fn sha256_hex(path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("Failed to open {path:?}"))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn preview(files: &FileSet, limit: usize) {
    println!("following files will be archived\n");
    for path in files.iter().take(limit) {
        println!("{path}");
    }
    if files.len() > limit {
        println!("\n...and {} more files!", files.len() - limit);
    }
    println!();
}

pub fn build(config_path: &Path, args: BuildArgs) -> Result<()> {
    let config = load_config(config_path)?;

    let roots: Vec<PathBuf> = args.path.iter().chain(&args.paths).cloned().collect();
    if roots.is_empty() && args.file.is_empty() {
        bail!("at least one --path, --file or positional path is required");
    }

    let excludes = gather_excludes(&config.excludes, &args)?;
    let filter = ExcludeFilter::new(&excludes)?;
    let files = FileCollector::new(roots)
        .with_files(args.file.iter().cloned())
        .collect(&filter)?;
    info!(count = files.len(), "Files collected");

    if args.interactive {
        preview(&files, args.limit);
        if !TerminalPrompter.confirm("would you like to continue?")? {
            return Err(VishopError::Cancelled.into());
        }
    }

    let bundle = write_bundle(&files, &config, args.archive_type, &args.output)?;
    println!("{}", bundle.display());
    println!("sha256: {}", sha256_hex(&bundle)?);
    Ok(())
}

fn describe(outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Uploaded { url } => format!("uploaded {url}"),
        PublishOutcome::Updated { url, details } => match details {
            DetailsSync::Unchanged => format!("updated {url}"),
            DetailsSync::Synced => format!("updated {url} (details synced)"),
            DetailsSync::Failed(e) => format!("updated {url} (details not synced: {e})"),
        },
        PublishOutcome::Skipped => "skipped".to_string(),
    }
}

/// Print one line per file and fail when any file failed.
pub fn summarize(report: &PublishReport) -> Result<()> {
    for file in &report.files {
        match &file.result {
            Ok(outcome) => println!("{}: {}", file.file.display(), describe(outcome)),
            Err(e) => eprintln!("{}: {}", file.file.display(), e),
        }
    }
    let failed = report.failures().count();
    if failed > 0 {
        bail!("{failed} of {} files failed to publish", report.files.len());
    }
    println!("Done!");
    Ok(())
}

pub async fn publish(config_path: &Path, args: PublishArgs) -> Result<()> {
    let prompter = TerminalPrompter;
    let options = PublishOptions {
        interactive: args.login.interactive(),
        description: args.description.clone(),
        config_name: config_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| CONFIG_FILENAME.to_string()),
        readme_dir: PathBuf::from("."),
    };
    let mut client = login(&args.login, &prompter).await?;
    let report = publish_bundles(&mut client, &prompter, &args.files, &options).await;
    summarize(&report)
}

pub fn clean(args: CleanArgs) -> Result<()> {
    if args.interactive
        && !TerminalPrompter.confirm(&format!(
            "\"{}\" will be deleted. are you sure?",
            args.path.display()
        ))?
    {
        return Err(VishopError::Cancelled.into());
    }
    match std::fs::remove_dir_all(&args.path) {
        Ok(()) => info!(path = %args.path.display(), "Removed output directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %args.path.display(), "Nothing to clean")
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to remove {:?}", args.path));
        }
    }
    println!("Done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_hex(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
