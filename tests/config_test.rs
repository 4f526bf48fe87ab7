//! Configuration loading and backend selection

use anyhow::Result;
use bumpfix::config::{Backend, Config, CONFIG_FILE_NAME};
use bumpfix::llm::factory;
use serial_test::serial;
use std::env;
use std::fs;

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert!(!config.project.package_manager.is_empty());
    assert!(config.project.snippet_radius > 0);
    assert!(config.project.command_timeout_secs > 0);
    assert!(!config.llm.remote.model.is_empty());
    assert!(!config.llm.local.model.is_empty());

    Ok(())
}

#[test]
fn test_config_load_without_files_returns_defaults() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = Config::load_with_path(None, dir.path())?;

    assert_eq!(config.project.build_script, "build");

    Ok(())
}

#[test]
fn test_full_config_file() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[project]
package_manager = "yarn"
build_script = "build:prod"
snippet_radius = 3
command_timeout_secs = 120
skip_upgrade = true
error_log = "build_errors.log"

[llm]
backend = "local"
fallback_to_local = true

[llm.remote]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[llm.local]
provider = "openai-compatible"
model = "qwen2.5-coder:7b"
base_url = "http://127.0.0.1:8080/v1"
max_tokens = 256
temperature = 0.2
timeout_secs = 300
"#,
    )?;

    let config = Config::load_with_path(None, dir.path())?;
    assert_eq!(config.project.package_manager, "yarn");
    assert_eq!(config.project.build_script, "build:prod");
    assert_eq!(config.project.snippet_radius, 3);
    assert!(config.project.skip_upgrade);
    assert_eq!(config.project.error_log.as_deref(), Some("build_errors.log"));
    assert_eq!(config.llm.backend, Backend::Local);
    assert!(config.llm.fallback_to_local);
    assert_eq!(config.llm.remote.provider, "openai");
    assert_eq!(config.llm.remote.timeout_secs, 120);
    assert_eq!(config.llm.local.model, "qwen2.5-coder:7b");
    assert_eq!(config.llm.local.get_max_tokens(), 256);
    assert_eq!(config.llm.local.timeout_secs, 300);

    Ok(())
}

#[test]
fn test_explicit_config_path_wins() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[project]\nbuild_script = \"from-project\"\n",
    )?;
    let explicit = dir.path().join("other.toml");
    fs::write(&explicit, "[project]\nbuild_script = \"from-explicit\"\n")?;

    let config = Config::load_with_path(explicit.to_str(), dir.path())?;
    assert_eq!(config.project.build_script, "from-explicit");

    Ok(())
}

#[test]
#[serial]
fn test_key_from_config_file_enables_remote() -> Result<()> {
    env::remove_var("BUMPFIX_TEST_CONFIG_FILE_KEY");
    let dir = tempfile::TempDir::new()?;
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[llm]
fallback_to_local = true

[llm.remote]
provider = "gemini"
model = "gemini-1.5-flash"
api_key_env = "BUMPFIX_TEST_CONFIG_FILE_KEY"
api_key = "from-file"
"#,
    )?;

    let config = Config::load_with_path(None, dir.path())?;
    let client = factory::create_client(&config.llm, false)?;
    assert_eq!(client.describe(), "gemini/gemini-1.5-flash");

    Ok(())
}

#[test]
fn test_missing_remote_key_with_fallback_uses_local() -> Result<()> {
    let mut config = Config::default();
    config.llm.remote.api_key_env = Some("BUMPFIX_TEST_NONEXISTENT_CONFIG_KEY".to_string());
    config.llm.fallback_to_local = true;

    let client = factory::create_client(&config.llm, false)?;
    assert!(client.describe().starts_with("local/"));

    Ok(())
}
