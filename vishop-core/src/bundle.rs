//! Bundle archives: writing a [`FileSet`] out, and reading single entries back in.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::collect::FileSet;
use crate::config::{PackageConfig, CONFIG_FILENAME};
use crate::error::{Result, VishopError};
use crate::pattern::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveType {
    Tar,
    #[default]
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveType {
    pub const ALL: [ArchiveType; 5] = [
        ArchiveType::Tar,
        ArchiveType::TarGz,
        ArchiveType::TarBz2,
        ArchiveType::TarXz,
        ArchiveType::Zip,
    ];

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveType::Tar => "tar",
            ArchiveType::TarGz => "tar.gz",
            ArchiveType::TarBz2 => "tar.bz2",
            ArchiveType::TarXz => "tar.xz",
            ArchiveType::Zip => "zip",
        }
    }

    /// Detect the archive type of an existing bundle from its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tgz") {
            return Some(ArchiveType::TarGz);
        }
        ArchiveType::ALL
            .into_iter()
            .find(|t| name.ends_with(&format!(".{}", t.extension())))
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveType {
    type Err = VishopError;

    fn from_str(s: &str) -> Result<Self> {
        ArchiveType::ALL
            .into_iter()
            .find(|t| t.extension() == s)
            .ok_or_else(|| VishopError::Config(format!("unsupported archive type '{s}'")))
    }
}

/// `"{name with spaces as hyphens}-{version}.{type}"`
pub fn bundle_name(config: &PackageConfig, archive_type: ArchiveType) -> String {
    format!(
        "{}-{}.{}",
        config.name.replace(' ', "-"),
        config.version,
        archive_type.extension()
    )
}

/// Name of a collected path inside the archive.
fn entry_name(path: &str) -> Result<&str> {
    let name = path.trim_start_matches('/');
    if name.is_empty() || name.split('/').any(|segment| segment == "..") {
        return Err(VishopError::Archive(format!(
            "cannot store '{path}' in a bundle: path escapes the bundle root"
        )));
    }
    Ok(name)
}

/// Write `files` into `output_dir` and return the bundle path.
///
/// The output directory is created when missing. Entries keep the collector's
/// relative paths; metadata is normalised so identical inputs give identical
/// archives. The archive is staged in a temporary file next to its final
/// name, so a failed build leaves any earlier bundle of that name untouched.
pub fn write_bundle(
    files: &FileSet,
    config: &PackageConfig,
    archive_type: ArchiveType,
    output_dir: &Path,
) -> Result<PathBuf> {
    if files.is_empty() {
        return Err(VishopError::EmptyBundle);
    }
    for path in files.iter() {
        entry_name(path)?;
    }
    std::fs::create_dir_all(output_dir)?;
    let bundle_path = output_dir.join(bundle_name(config, archive_type));
    info!(
        path = %bundle_path.display(),
        archive_type = %archive_type,
        files = files.len(),
        "Writing bundle"
    );

    let mut staged = tempfile::NamedTempFile::new_in(output_dir)?;
    let out = BufWriter::new(staged.as_file_mut());
    match archive_type {
        ArchiveType::Tar => {
            write_tar(out, files)?.flush()?;
        }
        ArchiveType::TarGz => {
            let encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
            write_tar(encoder, files)?.finish()?.flush()?;
        }
        ArchiveType::TarBz2 => {
            let encoder = bzip2::write::BzEncoder::new(out, bzip2::Compression::default());
            write_tar(encoder, files)?.finish()?.flush()?;
        }
        ArchiveType::TarXz => {
            let encoder = xz2::write::XzEncoder::new(out, 6);
            write_tar(encoder, files)?.finish()?.flush()?;
        }
        ArchiveType::Zip => {
            write_zip(out, files)?.flush()?;
        }
    }
    staged.as_file().sync_all()?;
    staged.persist(&bundle_path).map_err(|e| e.error)?;

    info!(path = %bundle_path.display(), "Bundle written");
    Ok(bundle_path)
}

fn write_tar<W: Write>(out: W, files: &FileSet) -> Result<W> {
    let mut builder = tar::Builder::new(out);
    for path in files.iter() {
        let name = entry_name(path)?;
        let file = File::open(path)?;
        let mut header = tar::Header::new_gnu();
        header.set_metadata_in_mode(&file.metadata()?, tar::HeaderMode::Deterministic);
        builder.append_data(&mut header, name, BufReader::new(file))?;
        debug!(entry = name, "Added tar entry");
    }
    Ok(builder.into_inner()?)
}

fn write_zip<W: Write + io::Seek>(out: W, files: &FileSet) -> Result<W> {
    let mut writer = zip::ZipWriter::new(out);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    for path in files.iter() {
        let name = entry_name(path)?;
        writer.start_file(name, options)?;
        io::copy(&mut File::open(path)?, &mut writer)?;
        debug!(entry = name, "Added zip entry");
    }
    Ok(writer.finish()?)
}

/// Pick the entry called `wanted`, else the first one containing a match of it
/// as a wildcard search pattern.
fn choose_entry(names: &[String], wanted: &str) -> Result<Option<usize>> {
    if let Some(index) = names.iter().position(|n| n == wanted) {
        return Ok(Some(index));
    }
    let pattern = Pattern::search(wanted)?;
    Ok(names.iter().position(|n| pattern.matches(n)))
}

fn open_tar(bundle: &Path, archive_type: ArchiveType) -> Result<tar::Archive<Box<dyn Read>>> {
    let file = BufReader::new(File::open(bundle)?);
    let reader: Box<dyn Read> = match archive_type {
        ArchiveType::Tar => Box::new(file),
        ArchiveType::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        ArchiveType::TarBz2 => Box::new(bzip2::read::BzDecoder::new(file)),
        ArchiveType::TarXz => Box::new(xz2::read::XzDecoder::new(file)),
        ArchiveType::Zip => {
            return Err(VishopError::Archive("zip bundle opened as tar".into()));
        }
    };
    Ok(tar::Archive::new(reader))
}

/// Names of every regular entry in a bundle, in archive order.
pub fn list_entries(bundle: &Path) -> Result<Vec<String>> {
    let archive_type = ArchiveType::from_path(bundle)
        .ok_or_else(|| VishopError::UnsupportedBundle(bundle.to_path_buf()))?;
    match archive_type {
        ArchiveType::Zip => {
            let mut archive = zip::ZipArchive::new(BufReader::new(File::open(bundle)?))?;
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let entry = archive.by_index(i)?;
                if entry.is_file() {
                    names.push(entry.name().to_string());
                }
            }
            Ok(names)
        }
        tar_type => {
            let mut archive = open_tar(bundle, tar_type)?;
            let mut names = Vec::new();
            for entry in archive.entries()? {
                let entry = entry?;
                if entry.header().entry_type().is_file() {
                    names.push(entry.path()?.to_string_lossy().into_owned());
                }
            }
            Ok(names)
        }
    }
}

/// Read one entry out of a bundle, matched by exact name or wildcard search.
pub fn read_entry(bundle: &Path, wanted: &str) -> Result<Vec<u8>> {
    let missing = || VishopError::MissingBundleEntry {
        bundle: bundle.to_path_buf(),
        pattern: wanted.to_string(),
    };
    let archive_type = ArchiveType::from_path(bundle)
        .ok_or_else(|| VishopError::UnsupportedBundle(bundle.to_path_buf()))?;
    let names = list_entries(bundle)?;
    let index = choose_entry(&names, wanted)?.ok_or_else(missing)?;
    let chosen = &names[index];
    debug!(bundle = %bundle.display(), wanted, entry = %chosen, "Reading bundle entry");

    let mut content = Vec::new();
    match archive_type {
        ArchiveType::Zip => {
            let mut archive = zip::ZipArchive::new(BufReader::new(File::open(bundle)?))?;
            archive.by_name(chosen)?.read_to_end(&mut content)?;
        }
        tar_type => {
            let mut archive = open_tar(bundle, tar_type)?;
            let mut found = false;
            for entry in archive.entries()? {
                let mut entry = entry?;
                if entry.path()?.to_string_lossy() == chosen.as_str() {
                    entry.read_to_end(&mut content)?;
                    found = true;
                    break;
                }
            }
            if !found {
                return Err(missing());
            }
        }
    }
    Ok(content)
}

/// Parse the package config embedded in a bundle.
pub fn config_from_bundle(bundle: &Path, config_name: &str) -> Result<PackageConfig> {
    let bytes = read_entry(bundle, config_name)?;
    let config = PackageConfig::from_json_slice(&bytes)?;
    config.trace_loaded();
    Ok(config)
}

/// Same as [`config_from_bundle`] with the default config file name.
pub fn default_config_from_bundle(bundle: &Path) -> Result<PackageConfig> {
    config_from_bundle(bundle, CONFIG_FILENAME)
}

/// First `README*` entry of a bundle, as text.
pub fn readme_from_bundle(bundle: &Path) -> Result<String> {
    let bytes = read_entry(bundle, "README*")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
