use helios::config::{Config, PriceResolution};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.api.token = "secret-token".to_string();
    cfg.resolution = PriceResolution::QuarterHourly;
    cfg.providers.default_enabled = false;
    cfg.providers.gas_enabled = vec!["EZ".to_string(), "EGSI".to_string()];

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.api.token, "secret-token");
    assert_eq!(loaded.resolution, PriceResolution::QuarterHourly);
    assert!(!loaded.providers.default_enabled);
    assert_eq!(loaded.providers.gas_enabled, cfg.providers.gas_enabled);
}

#[test]
fn resolution_parses_from_minutes_string() {
    let yaml = r#"
api:
  token: "secret"
  base_url: "https://enever.nl/api/"
  timeout_seconds: 10
providers:
  default_enabled: true
  electricity_enabled: []
  gas_enabled: []
  api_counter_enabled: true
resolution: "15"
logging:
  level: "INFO"
  file: "/tmp/helios.log"
  backup_count: 5
  console_output: true
  json_format: false
web:
  host: "127.0.0.1"
  port: 8090
state_dir: "/var/lib/helios"
timezone: "Europe/Amsterdam"
"#;

    let cfg: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.resolution, PriceResolution::QuarterHourly);
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.api.token = "secret".to_string();
    assert!(cfg.validate().is_ok());

    // Empty token
    cfg.api.token = "   ".to_string();
    assert!(cfg.validate().is_err());

    // Zero timeout
    cfg = Config::default();
    cfg.api.token = "secret".to_string();
    cfg.api.timeout_seconds = 0;
    assert!(cfg.validate().is_err());

    // Port zero
    cfg = Config::default();
    cfg.api.token = "secret".to_string();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    // Empty state dir
    cfg = Config::default();
    cfg.api.token = "secret".to_string();
    cfg.state_dir = String::new();
    assert!(cfg.validate().is_err());

    // Gas-only provider in the electricity list
    cfg = Config::default();
    cfg.api.token = "secret".to_string();
    cfg.providers.electricity_enabled = vec!["EGSI".to_string()];
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
