//! Integration tests for configuration precedence: file < environment < CLI

mod common;

use clap::Parser;
use common::temp_config_file;
use confab::cli::Cli;
use confab::config::Config;
use serial_test::serial;

const ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_ORG_ID",
    "OPENAI_PROJECT_ID",
    "CONFAB_MODEL",
    "CONFAB_API_BASE",
    "CONFAB_ADMIN_PASSWORD",
    "CONFAB_SESSION_DIR",
    "CONFAB_TIMEOUT_SECONDS",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["confab"];
    argv.extend_from_slice(args);
    argv.extend_from_slice(&["history", "list"]);
    Cli::try_parse_from(argv).unwrap()
}

const FILE: &str = r#"
provider:
  api_key: sk-file
  model: gpt-4o
storage:
  directory: /srv/chats-from-file
admin:
  password: from-file
"#;

#[test]
#[serial]
fn test_file_values_are_used() {
    clear_env();
    let (_dir, path) = temp_config_file(FILE);

    let config = Config::load(path.to_str().unwrap(), &cli(&[])).unwrap();
    assert_eq!(config.provider.api_key.as_deref(), Some("sk-file"));
    assert_eq!(config.provider.model, "gpt-4o");
    assert_eq!(config.storage.directory.as_deref(), Some("/srv/chats-from-file"));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let (_dir, path) = temp_config_file(FILE);
    std::env::set_var("OPENAI_API_KEY", "sk-env");
    std::env::set_var("CONFAB_MODEL", "gpt-4.1");
    std::env::set_var("CONFAB_ADMIN_PASSWORD", "from-env");

    let config = Config::load(path.to_str().unwrap(), &cli(&[])).unwrap();
    assert_eq!(config.provider.api_key.as_deref(), Some("sk-env"));
    assert_eq!(config.provider.model, "gpt-4.1");
    assert_eq!(config.admin.password.as_deref(), Some("from-env"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_session_dir_overrides_everything() {
    clear_env();
    let (_dir, path) = temp_config_file(FILE);

    let config = Config::load(
        path.to_str().unwrap(),
        &cli(&["--session-dir", "/tmp/from-cli"]),
    )
    .unwrap();
    assert_eq!(config.storage.directory.as_deref(), Some("/tmp/from-cli"));
}

#[test]
#[serial]
fn test_missing_key_is_fatal_at_validation() {
    clear_env();
    let config = Config::load("/nonexistent/confab.yaml", &cli(&[])).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    clear_env();
    let (_dir, path) = temp_config_file("provider: [not, a, map");
    assert!(Config::load(path.to_str().unwrap(), &cli(&[])).is_err());
}
