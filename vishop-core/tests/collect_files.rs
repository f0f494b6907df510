use std::fs;
use std::path::Path;
use tempfile::tempdir;
use vishop_core::collect::{collect, normalize, FileCollector};
use vishop_core::pattern::ExcludeFilter;
use vishop_core::VishopError;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, rel).unwrap();
}

fn plugin_tree() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    for rel in [
        "plugin/vishop.vim",
        "autoload/vishop.vim",
        "doc/vishop.txt",
        "doc/tags",
        ".hidden",
        "plugin/.swap",
        ".git/config",
        "dist/old-1.0.zip",
    ] {
        touch(dir.path(), rel);
    }
    dir
}

fn rel(root: &Path, rel: &str) -> String {
    normalize(&root.join(rel))
}

#[test]
fn dot_files_are_never_collected() {
    let dir = plugin_tree();
    let files = collect([dir.path()], &ExcludeFilter::default()).unwrap();

    assert!(files
        .iter()
        .all(|p| !Path::new(p).file_name().unwrap().to_string_lossy().starts_with('.')));
    assert!(files.contains(&rel(dir.path(), "plugin/vishop.vim")));
    // Files inside dot-directories are only skipped through excludes.
    assert!(files.contains(&rel(dir.path(), ".git/config")));
}

#[test]
fn excludes_drop_directories_and_globs() {
    let dir = plugin_tree();
    let filter = ExcludeFilter::new([".git", "dist", "tags"]).unwrap();
    let files = collect([dir.path()], &filter).unwrap();

    let mut kept: Vec<&str> = files.iter().collect();
    kept.sort();
    assert_eq!(
        kept,
        vec![
            rel(dir.path(), "autoload/vishop.vim"),
            rel(dir.path(), "doc/vishop.txt"),
            rel(dir.path(), "plugin/vishop.vim"),
        ]
    );
}

#[test]
fn overlapping_roots_are_deduplicated() {
    let dir = plugin_tree();
    let filter = ExcludeFilter::new([".git", "dist"]).unwrap();
    let once = collect([dir.path()], &filter).unwrap();
    let twice = collect(
        [dir.path().to_path_buf(), dir.path().join("plugin/../plugin")],
        &filter,
    )
    .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn empty_result_is_an_error() {
    let dir = plugin_tree();
    let err = collect([dir.path()], &ExcludeFilter::new(["**"]).unwrap()).unwrap_err();
    assert!(matches!(err, VishopError::EmptyBundle));
}

#[test]
fn root_must_be_a_directory() {
    let dir = plugin_tree();
    let file = dir.path().join("doc/tags");
    let err = collect([&file], &ExcludeFilter::default()).unwrap_err();
    assert!(matches!(err, VishopError::NotADirectory(p) if p == file));
}

#[test]
fn explicit_files_are_added_and_filtered() {
    let dir = plugin_tree();
    let extra = dir.path().join("doc/tags");
    let files = FileCollector::new(Vec::<std::path::PathBuf>::new())
        .with_files([extra.clone(), dir.path().join("doc/vishop.txt")])
        .collect(&ExcludeFilter::new(["vishop.txt"]).unwrap())
        .unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.contains(&normalize(&extra)));

    let missing = FileCollector::new(Vec::<std::path::PathBuf>::new())
        .with_files([dir.path().join("nope.vim")])
        .collect(&ExcludeFilter::default())
        .unwrap_err();
    assert!(matches!(missing, VishopError::NotAFile(_)));
}
