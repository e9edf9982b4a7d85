use std::path::PathBuf;
use std::time::Duration;

use super::types::TesseraConfig;
use crate::error::ConfigError;

#[test]
fn empty_toml_gives_reference_run() {
    let cfg = TesseraConfig::from_toml("").unwrap();
    assert_eq!((cfg.dataset.rows, cfg.dataset.cols), (20, 20));
    assert_eq!(cfg.dataset.path, None);
    assert_eq!(cfg.window.dims(), (4, 5));
    assert_eq!(cfg.pool.workers, 4);
    assert!(cfg.transport.is_local());
    assert_eq!(cfg.output.path, PathBuf::from("tessera-results.txt"));
}

#[test]
fn parse_full_toml() {
    let toml = r#"
[dataset]
rows = 8
cols = 6
path = "data/table.txt"

[window]
rows = 2
cols = 3

[pool]
workers = 7

[transport]
kind = "tcp"
endpoint = "tcp://10.0.0.1:6000"

[processing]
latency_ms = 15

[output]
path = "out/results.txt"
"#;
    let cfg = TesseraConfig::from_toml(toml).unwrap();
    assert_eq!((cfg.dataset.rows, cfg.dataset.cols), (8, 6));
    assert_eq!(cfg.dataset.path, Some(PathBuf::from("data/table.txt")));
    assert_eq!(cfg.window.dims(), (2, 3));
    assert_eq!(cfg.pool.workers, 7);
    assert_eq!(cfg.transport.kind, "tcp");
    assert_eq!(cfg.endpoint().unwrap().to_string(), "tcp://10.0.0.1:6000");
    assert_eq!(cfg.processing.latency().base, Duration::from_millis(15));
    assert_eq!(cfg.output.path, PathBuf::from("out/results.txt"));
}

#[test]
fn partial_sections_keep_defaults() {
    let cfg = TesseraConfig::from_toml("[window]\nrows = 3\n").unwrap();
    assert_eq!(cfg.window.dims(), (3, 5));
    assert_eq!(cfg.pool.workers, 4);
}

#[test]
fn zero_workers_rejected() {
    let err = TesseraConfig::from_toml("[pool]\nworkers = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("pool.workers")));
}

#[test]
fn unknown_transport_kind_rejected() {
    let err = TesseraConfig::from_toml("[transport]\nkind = \"udp\"\n").unwrap_err();
    assert!(err.to_string().contains("invalid transport kind 'udp'"));
}

#[test]
fn endpoint_must_match_kind() {
    let toml = "[transport]\nkind = \"ipc\"\nendpoint = \"tcp://127.0.0.1:5570\"\n";
    assert!(TesseraConfig::from_toml(toml).is_err());

    let toml = "[transport]\nkind = \"tcp\"\nendpoint = \"tcp://nohost\"\n";
    assert!(TesseraConfig::from_toml(toml).is_err());

    let toml = "[transport]\nkind = \"ipc\"\nendpoint = \"ipc:///tmp/tessera/hub.sock\"\n";
    assert!(TesseraConfig::from_toml(toml).is_ok());
}

#[test]
fn local_kind_ignores_endpoint() {
    let toml = "[transport]\nkind = \"local\"\nendpoint = \"garbage\"\n";
    assert!(TesseraConfig::from_toml(toml).is_ok());
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = TesseraConfig::from_toml("[pool\nworkers = 2").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn env_override_applies_after_parse() {
    // Only this test touches the jitter override.
    std::env::set_var("TESSERA_PROCESSING_JITTER_MS", "9");
    let cfg = TesseraConfig::from_toml("[processing]\njitter_ms = 1\n").unwrap();
    std::env::remove_var("TESSERA_PROCESSING_JITTER_MS");
    assert_eq!(cfg.processing.jitter_ms, 9);
}

#[test]
fn from_file_reads_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tessera.toml");
    std::fs::write(&path, "[pool]\nworkers = 2\n").unwrap();
    let cfg = TesseraConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.pool.workers, 2);

    let missing = TesseraConfig::from_file(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io(_)));
}
