// Config loading and validation tests

use hostwatch::config::AppConfig;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/hostwatch.db"
max_pool_size = 10
retention_days = 14

[engine]
min_poll_interval_secs = 30
gap_factor = 2
navigation_cache_ttl_secs = 10
index_bucket_secs = 600

[ingest]
flush_rate = 10
flush_interval_secs = 1

[maintenance]
prune_interval_secs = 600
vacuum_schedule = "0 0 3 * * *"
vacuum_interval_secs = 86400
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8081
host = "127.0.0.1"

[database]
path = "data/hostwatch.db"
max_pool_size = 4
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/hostwatch.db");
    assert_eq!(config.database.retention_days, 14);
    assert_eq!(config.engine.index_bucket_secs, 600);
    assert_eq!(config.ingest.flush_rate, 10);
    assert_eq!(
        config.maintenance.vacuum_schedule.as_deref(),
        Some("0 0 3 * * *")
    );
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("minimal");
    assert_eq!(config.database.retention_days, 7);
    assert_eq!(config.engine.min_poll_interval_secs, 30);
    assert_eq!(config.engine.gap_factor, 2);
    assert_eq!(config.engine.reboot_tolerance_secs, None);
    assert_eq!(config.engine.navigation_cache_ttl_secs, 5);
    assert_eq!(config.engine.index_bucket_secs, 300);
    assert_eq!(config.ingest.flush_rate, 16);
    assert_eq!(config.ingest.flush_interval_secs, 2);
    assert_eq!(config.maintenance.prune_interval_secs, 3600);
    assert!(config.maintenance.vacuum_schedule.is_none());
}

#[test]
fn test_engine_settings_follow_config() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let settings = config.engine_settings();
    assert_eq!(settings.retention_days, 14);
    assert_eq!(settings.retention_days, config.database.retention_days);
    assert_eq!(settings.min_poll_interval_secs, 30);
    assert_eq!(settings.navigation_cache_ttl, Duration::from_secs(10));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/hostwatch.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 10", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_retention_out_of_range() {
    for days in ["0", "91"] {
        let bad = VALID_CONFIG.replace("retention_days = 14", &format!("retention_days = {days}"));
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("database.retention_days"), "{days}");
    }
    let edge = VALID_CONFIG.replace("retention_days = 14", "retention_days = 90");
    assert!(AppConfig::load_from_str(&edge).is_ok());
}

#[test]
fn test_config_validation_rejects_poll_floor_below_minimum() {
    let bad = VALID_CONFIG.replace("min_poll_interval_secs = 30", "min_poll_interval_secs = 10");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("engine.min_poll_interval_secs"));
}

#[test]
fn test_config_validation_rejects_gap_factor_zero() {
    let bad = VALID_CONFIG.replace("gap_factor = 2", "gap_factor = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("engine.gap_factor"));
}

#[test]
fn test_config_validation_rejects_reboot_tolerance_zero() {
    let bad = VALID_CONFIG.replace("gap_factor = 2", "gap_factor = 2\nreboot_tolerance_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("engine.reboot_tolerance_secs"));
}

#[test]
fn test_config_validation_rejects_flush_rate_zero() {
    let bad = VALID_CONFIG.replace("flush_rate = 10", "flush_rate = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("ingest.flush_rate"));
}

#[test]
fn test_config_validation_rejects_flush_interval_zero() {
    let bad = VALID_CONFIG.replace("flush_interval_secs = 1", "flush_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("ingest.flush_interval_secs"));
}

#[test]
fn test_config_validation_rejects_prune_interval_zero() {
    let bad = VALID_CONFIG.replace("prune_interval_secs = 600", "prune_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("maintenance.prune_interval_secs"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.database.path, "data/hostwatch.db");
}
