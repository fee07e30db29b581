use calmgate_lib::config::{load_from_path, IdPolicy, RejectMode};
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(e) => panic!("tempfile creation should succeed: {e}"),
    };
    if let Err(e) = file.write_all(contents.as_bytes()) {
        panic!("tempfile write should succeed: {e}");
    }
    file
}

#[test]
fn test_minimal_config_gets_defaults() {
    let file = write_config(
        r#"
listen = "127.0.0.1:7000"
backend = "127.0.0.1:9000"
"#,
    );
    let cfg = match load_from_path(file.path()) {
        Ok(cfg) => cfg,
        Err(e) => panic!("minimal config should load: {e}"),
    };

    assert!(cfg.dos.enabled);
    assert_eq!(cfg.dos.id, IdPolicy::RemoteAddress);
    assert_eq!(cfg.dos.max_requests_per_second, 100);
    assert_eq!(cfg.dos.max_trackers, 10_000);
    assert_eq!(cfg.dos.sample_period_ms, 100);
    assert!((cfg.dos.alpha - 0.2).abs() < f64::EPSILON);
    assert_eq!(cfg.dos.reject, RejectMode::Delayed);
    assert_eq!(cfg.dos.delay_ms, 1000);
    assert_eq!(cfg.dos.max_delay_queue, 1000);
    assert_eq!(cfg.dos.reject_status, 420);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn test_full_dos_section_parses() {
    let file = write_config(
        r#"
listen = "0.0.0.0:8080"
backend = "backend-1:9000"

[dos]
enabled = true
id = "connection_id"
max_requests_per_second = 50
max_trackers = 500
sample_period_ms = 250
alpha = 0.5
reject = "immediate"
delay_ms = 400
max_delay_queue = 32
reject_status = 429

[logging]
level = "debug"
show_target = true
"#,
    );
    let cfg = match load_from_path(file.path()) {
        Ok(cfg) => cfg,
        Err(e) => panic!("full config should load: {e}"),
    };

    assert_eq!(cfg.dos.id, IdPolicy::ConnectionId);
    assert_eq!(cfg.dos.max_requests_per_second, 50);
    assert_eq!(cfg.dos.sample_period_ms, 250);
    assert_eq!(cfg.dos.reject, RejectMode::Immediate);
    assert_eq!(cfg.dos.reject_status, 429);
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.show_target);
}

#[test]
fn test_max_trackers_sentinel_resolves_to_default() {
    let file = write_config(
        r#"
listen = "127.0.0.1:7000"
backend = "127.0.0.1:9000"

[dos]
max_trackers = -1
"#,
    );
    let cfg = match load_from_path(file.path()) {
        Ok(cfg) => cfg,
        Err(e) => panic!("config should load: {e}"),
    };
    assert_eq!(cfg.dos.effective_max_trackers(), 10_000);
}

#[test]
fn test_out_of_range_values_are_rejected() {
    for (field, value) in [
        ("alpha", "1.5"),
        ("alpha", "0.0"),
        ("sample_period_ms", "0"),
        ("sample_period_ms", "1500"),
        ("max_requests_per_second", "0"),
        ("delay_ms", "0"),
        ("max_delay_queue", "0"),
        ("reject_status", "99"),
    ] {
        let file = write_config(&format!(
            "listen = \"127.0.0.1:7000\"\nbackend = \"127.0.0.1:9000\"\n\n[dos]\n{field} = {value}\n"
        ));
        assert!(
            load_from_path(file.path()).is_err(),
            "dos.{field} = {value} should be rejected"
        );
    }
}

#[test]
fn test_unknown_id_policy_is_rejected() {
    let file = write_config(
        r#"
listen = "127.0.0.1:7000"
backend = "127.0.0.1:9000"

[dos]
id = "x_forwarded_for"
"#,
    );
    assert!(load_from_path(file.path()).is_err());
}

#[test]
fn test_empty_backend_is_rejected() {
    let file = write_config(
        r#"
listen = "127.0.0.1:7000"
backend = "  "
"#,
    );
    assert!(load_from_path(file.path()).is_err());
}

#[test]
fn test_missing_file_is_a_config_error() {
    let err = match load_from_path("/nonexistent/calmgate.toml") {
        Ok(_) => panic!("missing file should not load"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("Configuration error"));
}
