// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use yare::parameterized;

fn test_options() -> Options {
    Options {
        worker_id: 7,
        broadcast_address: "web01.example".to_string(),
        logger: None,
        ..Options::default()
    }
}

#[parameterized(
    lowest = { 0 },
    middle = { 512 },
    highest = { 1023 },
)]
fn worker_id_in_range_is_valid(id: i64) {
    let opts = Options {
        worker_id: id,
        ..test_options()
    };
    assert!(opts.validate().is_ok());
}

#[parameterized(
    negative = { -1 },
    one_past_max = { 1024 },
    far_past_max = { 1_000_000 },
)]
fn worker_id_out_of_range_is_rejected(id: i64) {
    let opts = Options {
        worker_id: id,
        ..test_options()
    };
    assert!(matches!(opts.validate(), Err(ConfigError::WorkerId(got)) if got == id));
}

#[parameterized(
    zero = { 0, false },
    one = { 1, true },
    six = { 6, true },
    nine = { 9, true },
    ten = { 10, false },
)]
fn deflate_level_bounds(level: i32, valid: bool) {
    let opts = Options {
        max_deflate_level: level,
        ..test_options()
    };
    match opts.validate() {
        Ok(()) => assert!(valid, "level {} should be rejected", level),
        Err(ConfigError::DeflateLevel(got)) => {
            assert!(!valid, "level {} should be accepted", level);
            assert_eq!(got, level);
        }
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[parameterized(
    ipv4 = { "0.0.0.0:4151", "0.0.0.0", 4151 },
    hostname = { "localhost:80", "localhost", 80 },
    empty_host = { ":4151", "", 4151 },
    ipv6 = { "[::1]:4151", "::1", 4151 },
)]
fn split_host_port_accepts(addr: &str, host: &str, port: u16) {
    assert_eq!(split_host_port(addr), Ok((host, port)));
}

#[parameterized(
    no_port = { "localhost" },
    bad_port = { "localhost:http" },
    port_too_large = { "localhost:70000" },
    bare_ipv6 = { "::1:4151" },
    unclosed_bracket = { "[::1:4151" },
)]
fn split_host_port_rejects(addr: &str) {
    assert!(split_host_port(addr).is_err());
}

#[test]
fn unparseable_http_address_is_rejected() {
    let opts = Options {
        http_address: "not-an-address".to_string(),
        ..test_options()
    };
    assert!(matches!(
        opts.validate(),
        Err(ConfigError::Address { field: "--http-address", .. })
    ));
}

#[test]
fn unparseable_tcp_address_is_rejected() {
    let opts = Options {
        tcp_address: "0.0.0.0".to_string(),
        ..test_options()
    };
    assert!(matches!(
        opts.validate(),
        Err(ConfigError::Address { field: "--tcp-address", .. })
    ));
}

#[test]
fn unknown_log_level_is_rejected() {
    let opts = Options {
        log_level: "loud".to_string(),
        ..test_options()
    };
    assert!(matches!(opts.validate(), Err(ConfigError::LogLevel(_))));
}

#[test]
fn log_level_is_case_insensitive() {
    let opts = Options {
        log_level: "DEBUG".to_string(),
        ..test_options()
    };
    assert!(opts.validate().is_ok());
}

#[test]
fn resolve_substitutes_statsd_host_key() {
    let opts = test_options().resolve().unwrap();
    assert_eq!(opts.statsd_prefix, "nq.web01_example_4151.");
}

#[test]
fn resolve_appends_separator_to_statsd_prefix() {
    let opts = Options {
        statsd_prefix: "metrics".to_string(),
        ..test_options()
    };
    assert_eq!(opts.resolve().unwrap().statsd_prefix, "metrics.");
}

#[test]
fn resolve_keeps_empty_statsd_prefix() {
    let opts = Options {
        statsd_prefix: String::new(),
        ..test_options()
    };
    assert_eq!(opts.resolve().unwrap().statsd_prefix, "");
}

#[test]
fn resolve_is_idempotent() {
    let once = test_options().resolve().unwrap();
    let twice = once.clone().resolve().unwrap();
    assert_eq!(once.statsd_prefix, twice.statsd_prefix);
    assert_eq!(once.data_path, twice.data_path);
}

#[test]
fn resolve_defaults_data_path_to_cwd() {
    let opts = test_options().resolve().unwrap();
    assert_eq!(opts.data_path, Some(std::env::current_dir().unwrap()));
}

#[test]
fn resolve_keeps_explicit_data_path() {
    let dir = TempDir::new().unwrap();
    let opts = Options {
        data_path: Some(dir.path().to_path_buf()),
        ..test_options()
    };
    assert_eq!(opts.resolve().unwrap().data_dir(), dir.path());
}

#[test]
fn resolve_rejects_before_touching_anything() {
    let opts = Options {
        worker_id: 1024,
        statsd_prefix: "raw.%s".to_string(),
        ..test_options()
    };
    assert!(matches!(opts.resolve(), Err(ConfigError::WorkerId(1024))));
}

#[test]
fn host_key_replaces_dots_and_colons() {
    assert_eq!(host_key("web01.example:4151"), "web01_example_4151");
    assert_eq!(host_key("[::1]:80"), "[__1]_80");
}

#[test]
fn join_host_port_brackets_ipv6() {
    assert_eq!(join_host_port("::1", 80), "[::1]:80");
    assert_eq!(join_host_port("host", 80), "host:80");
}

#[test]
fn default_worker_id_is_stable_and_in_range() {
    let a = default_worker_id("broker-a");
    assert_eq!(a, default_worker_id("broker-a"));
    assert!((0..MAX_WORKER_ID).contains(&a));
}

#[test]
fn defaults_are_valid() {
    let opts = Options::default();
    assert!(opts.validate().is_ok());
    assert_eq!(opts.max_deflate_level, 6);
    assert!(opts.logger.is_some());
}

#[test]
fn worker_identity_narrows_valid_id() {
    let opts = Options {
        worker_id: 1023,
        ..test_options()
    };
    assert_eq!(opts.worker_identity().unwrap(), 1023);
}

#[test]
fn load_reads_toml_and_fills_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
id = 42
http_address = "127.0.0.1:9000"
statsd_interval = "5s"
"#
    )
    .unwrap();

    let opts = Options::load(file.path()).unwrap();
    assert_eq!(opts.worker_id, 42);
    assert_eq!(opts.http_address, "127.0.0.1:9000");
    assert_eq!(opts.statsd_interval, Duration::from_secs(5));
    assert_eq!(opts.tcp_address, "0.0.0.0:4150");
    assert_eq!(opts.max_deflate_level, 6);
}

#[test]
fn load_reports_parse_errors() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "worker_id = \"not a number\"").unwrap();

    assert!(matches!(
        Options::load(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");
    assert!(matches!(Options::load(&path), Err(ConfigError::Read { .. })));
}

#[test]
fn load_or_default_without_path_uses_defaults() {
    let opts = Options::load_or_default(None).unwrap();
    assert_eq!(opts.http_address, "0.0.0.0:4151");
}

#[test]
fn logf_without_logger_is_silent() {
    let opts = test_options();
    opts.logf(format_args!("FATAL: nobody hears this"));
}

#[test]
fn logf_writes_through_logger() {
    use std::sync::Mutex;

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let opts = Options {
        logger: Some(Arc::new(move |_depth: usize, msg: &str| {
            sink.lock().unwrap().push(msg.to_string());
        })),
        ..test_options()
    };

    opts.logf(format_args!("INFO: worker {}", 7));
    assert_eq!(lines.lock().unwrap().as_slice(), &["INFO: worker 7".to_string()]);
}

#[test]
fn defaults_follow_os_hostname_not_shell_variable() {
    let os_name = hostname::get().unwrap().to_string_lossy().into_owned();
    std::env::set_var("HOSTNAME", "shell-says-otherwise");

    let opts = Options::default();

    std::env::remove_var("HOSTNAME");
    assert_eq!(opts.broadcast_address, os_name);
    assert_eq!(opts.worker_id, default_worker_id(&os_name));
}
