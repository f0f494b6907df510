use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;
use vishop::load_config::{load_config, resolve_base_url, resolve_password, resolve_username};
use vishop_core::config::ScriptType;

#[test]
fn loads_a_valid_config() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(
        config_file.path(),
        r#"{"name":"vim-foo","type":"ftplugin","required":"7.4","version":"0.3","summary":"foo","excludes":["t"]}"#,
    )
    .unwrap();

    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.name, "vim-foo");
    assert_eq!(config.script_type, ScriptType::Ftplugin);
    assert_eq!(config.excludes, vec!["t"]);
    assert!(!config.private);
}

#[test]
fn missing_file_and_bad_json_are_errors() {
    let err = load_config("/definitely/not/here/vishop.json").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), r#"{"name":"x"}"#).unwrap();
    let err = load_config(config_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("invalid configuration"));
}

fn clear_env() {
    for var in [
        "VISHOP_USERNAME",
        "VISHOP_PASSWORD",
        "VIPERS_USERNAME",
        "VIPERS_PASSWORD",
        "VISHOP_BASE_URL",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn flags_win_over_environment() {
    clear_env();
    env::set_var("VISHOP_USERNAME", "from-env");
    assert_eq!(resolve_username(Some("flag".into())).as_deref(), Some("flag"));
    assert_eq!(resolve_username(None).as_deref(), Some("from-env"));
    clear_env();
}

#[test]
#[serial]
fn legacy_variables_are_a_fallback() {
    clear_env();
    env::set_var("VIPERS_PASSWORD", "old");
    assert_eq!(resolve_password(None).as_deref(), Some("old"));

    env::set_var("VISHOP_PASSWORD", "new");
    assert_eq!(resolve_password(None).as_deref(), Some("new"));

    env::set_var("VISHOP_PASSWORD", "");
    assert_eq!(resolve_password(None).as_deref(), Some("old"));
    clear_env();
}

#[test]
#[serial]
fn base_url_defaults_to_vim_org() {
    clear_env();
    assert_eq!(resolve_base_url(None), "https://www.vim.org");
    env::set_var("VISHOP_BASE_URL", "http://localhost:8080");
    assert_eq!(resolve_base_url(None), "http://localhost:8080");
    assert_eq!(
        resolve_base_url(Some("http://other".into())),
        "http://other"
    );
    clear_env();
}
