//! `init`: create a package config file, prompting for whatever the flags left out.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use vishop_core::config::{PackageConfig, ScriptType};
use vishop_core::contract::Prompter;

/// Vim versions offered by the upload form.
pub const VIM_VERSIONS: [&str; 7] = ["5.7", "6.0", "7.0", "7.2", "7.3", "7.4", "8.0"];

/// Field values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct InitFields {
    pub name: Option<String>,
    pub script_type: Option<ScriptType>,
    pub required: String,
    pub version: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub install_details: Option<String>,
    pub private: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn ask_required<P: Prompter + ?Sized>(prompter: &P, label: &str) -> Result<String> {
    loop {
        let value = prompter.input(label)?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }
}

fn ask_optional<P: Prompter + ?Sized>(prompter: &P, label: &str) -> Result<Option<String>> {
    Ok(non_empty(Some(prompter.input(&format!("{label} (optional)"))?)))
}

/// Complete `fields` into a config. Without a terminal every required field must be given.
pub fn build_config<P: Prompter + ?Sized>(
    fields: InitFields,
    interactive: bool,
    prompter: &P,
) -> Result<PackageConfig> {
    let name = non_empty(fields.name);
    let summary = non_empty(fields.summary);

    if !interactive && (name.is_none() || fields.script_type.is_none() || summary.is_none()) {
        bail!("init failed! there are empty fields (name, type and summary are required)");
    }

    let name = match name {
        Some(name) => name,
        None => ask_required(prompter, "name")?,
    };
    let script_type = match fields.script_type {
        Some(script_type) => script_type,
        None => {
            let items: Vec<String> = ScriptType::ALL.iter().map(ToString::to_string).collect();
            let index = prompter.select("select type", &items)?;
            ScriptType::ALL
                .get(index)
                .copied()
                .ok_or_else(|| anyhow!("no script type at index {index}"))?
        }
    };
    let summary = match summary {
        Some(summary) => summary,
        None => ask_required(prompter, "summary")?,
    };
    let description = match non_empty(fields.description) {
        Some(description) => Some(description),
        None if interactive => ask_optional(prompter, "description")?,
        None => None,
    };
    let install_details = match non_empty(fields.install_details) {
        Some(details) => Some(details),
        None if interactive => ask_optional(prompter, "install details")?,
        None => None,
    };

    let config = PackageConfig {
        name,
        script_type,
        required: fields.required,
        version: fields.version,
        summary,
        description,
        install_details,
        excludes: Vec::new(),
        private: fields.private,
    };
    config.validate()?;
    Ok(config)
}

/// Write `config` as four-space indented JSON.
pub fn write_config(config: &PackageConfig, output: &Path) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config
        .serialize(&mut serializer)
        .context("Failed to serialise config")?;
    buf.push(b'\n');
    std::fs::write(output, buf).with_context(|| format!("Failed to write {output:?}"))?;
    info!(path = %output.display(), name = %config.name, "Config written");
    Ok(())
}
