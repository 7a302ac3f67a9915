//! Configuration and request file tests

use std::io::Write;

use clap::Parser;
use storsync::account::ReconcileRequest;
use storsync::cli::{build_request, load_request_file, Cli, ReconcileArgs};
use storsync::config::{load_from_file, save_config_to, Config, CredentialType};
use storsync::StorsyncError;
use tempfile::{Builder, NamedTempFile, TempDir};

#[tokio::test]
async fn test_load_toml_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
subscription_id = "sub-123"
default_resource_group = "rg-default"
credential_type = "clientsecret"
client_id = "app-id"
"#
    )
    .unwrap();

    let config = load_from_file(file.path()).await.unwrap();
    assert_eq!(config.subscription_id, "sub-123");
    assert_eq!(config.default_resource_group, "rg-default");
    assert_eq!(config.credential_type, CredentialType::ClientSecret);
    assert_eq!(config.client_id.as_deref(), Some("app-id"));
    assert_eq!(config.management_endpoint, "https://management.azure.com");
}

#[tokio::test]
async fn test_load_json_config() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(
        file,
        r#"{{"subscription_id": "sub-json", "storage_endpoint_suffix": "core.chinacloudapi.cn"}}"#
    )
    .unwrap();

    let config = load_from_file(file.path()).await.unwrap();
    assert_eq!(config.subscription_id, "sub-json");
    assert_eq!(config.storage_endpoint_suffix, "core.chinacloudapi.cn");
}

#[tokio::test]
async fn test_malformed_toml_reports_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "subscription_id = \"unterminated").unwrap();

    let err = load_from_file(file.path()).await.unwrap_err();
    assert!(matches!(err, StorsyncError::TomlError(_)));
}

#[tokio::test]
async fn test_debug_setting_from_file_enables_debug_logging() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "debug = true").unwrap();

    let config = load_from_file(file.path()).await.unwrap();
    let cli = Cli::try_parse_from(["storsync", "config", "show"]).unwrap();
    assert!(cli.debug_enabled(&config));
}

#[tokio::test]
async fn test_saved_config_omits_client_secret() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("storsync.toml");
    let config = Config {
        subscription_id: "sub-123".to_string(),
        client_secret: Some("hunter2".to_string()),
        ..Config::default()
    };

    save_config_to(&config, &path).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("hunter2"));

    let loaded = load_from_file(&path).await.unwrap();
    assert_eq!(loaded.subscription_id, "sub-123");
    assert_eq!(loaded.client_secret, None);
}

#[test]
fn test_request_file_accepts_resource_group_name_alias() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "resource_group_name: rg1\nname: acct1\nenable_monitoring: 15\napprove_private_endpoint_connections: true"
    )
    .unwrap();

    let request = load_request_file(file.path()).unwrap();
    assert_eq!(
        request,
        ReconcileRequest {
            enable_monitoring: Some(15),
            approve_private_endpoint_connections: true,
            ..ReconcileRequest::new("rg1", "acct1")
        }
    );
}

#[test]
fn test_request_file_rejects_unknown_fields() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "resource_group: rg1\nname: acct1\nstate: present").unwrap();

    assert!(load_request_file(file.path()).is_err());
}

#[test]
fn test_flags_override_request_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"resource_group": "rg1", "name": "acct1", "enable_monitoring": 30}}"#)
        .unwrap();

    let args = ReconcileArgs {
        file: Some(file.path().to_path_buf()),
        enable_monitoring: Some(7),
        location: Some("westeurope".to_string()),
        ..Default::default()
    };

    let request = build_request(args, &Config::default()).unwrap();
    assert_eq!(request.resource_group, "rg1");
    assert_eq!(request.name, "acct1");
    assert_eq!(request.enable_monitoring, Some(7));
    assert_eq!(request.location.as_deref(), Some("westeurope"));
}

#[test]
fn test_out_of_range_retention_is_rejected() {
    let args = ReconcileArgs {
        resource_group: Some("rg1".to_string()),
        name: Some("acct1".to_string()),
        enable_monitoring: Some(366),
        ..Default::default()
    };

    assert!(build_request(args, &Config::default()).is_err());
}
