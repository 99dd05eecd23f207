use std::fs;
use std::path::Path;

use batchline_config::{
    ConfigLoadError, ConfigLoader, ConfigLoaderOptions, ConfigOverrides, EnvSource,
    SchedulerConfigSource,
};
use tempfile::TempDir;

fn loader(dir: &Path, env: EnvSource) -> ConfigLoader {
    ConfigLoader::with_options(ConfigLoaderOptions {
        base_dir: Some(dir.to_path_buf()),
        env,
        ..ConfigLoaderOptions::default()
    })
}

fn empty_env() -> EnvSource {
    EnvSource::fixed(Vec::<(String, String)>::new())
}

#[test]
fn defaults_when_nothing_is_configured() {
    let dir = TempDir::new().unwrap();
    let load = loader(dir.path(), empty_env()).load().expect("load");

    assert_eq!(load.config.server.host, "0.0.0.0");
    assert_eq!(load.config.server.port, 5000);
    assert_eq!(load.config.scheduler.rate_limit_interval_ms, 5_000);
    assert_eq!(load.config.scheduler.processor.simulated_latency_ms, 1_000);
    assert_eq!(load.config.scheduler.processor.timeout_ms, None);
    assert_eq!(load.config.metadata.config_path, None);
    assert!(!load.config.metadata.env_file_loaded);
    assert_eq!(
        load.config.metadata.scheduler_source,
        SchedulerConfigSource::Default
    );
    assert!(load.warnings.is_empty());
}

#[test]
fn discovers_toml_in_default_location() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    let path = dir.path().join("config/batchline.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8080

[scheduler]
rate_limit_interval_ms = 250

[scheduler.processor]
simulated_latency_ms = 10
"#,
    )
    .unwrap();

    let load = loader(dir.path(), empty_env()).load().expect("load");
    assert_eq!(load.config.server.port, 8080);
    assert_eq!(load.config.server.host, "0.0.0.0");
    assert_eq!(load.config.scheduler.rate_limit_interval_ms, 250);
    assert_eq!(load.config.scheduler.processor.simulated_latency_ms, 10);
    assert_eq!(load.config.scheduler.processor.max_attempts, 1);
    assert_eq!(load.config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(
        load.config.metadata.scheduler_source,
        SchedulerConfigSource::File(path)
    );
}

#[test]
fn json_file_from_env_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    fs::write(&path, r#"{"server": {"host": "127.0.0.1"}}"#).unwrap();

    let env = EnvSource::fixed([("BATCHLINE_CONFIG_PATH", path.to_string_lossy().to_string())]);
    let load = loader(dir.path(), env).load().expect("load");
    assert_eq!(load.config.server.host, "127.0.0.1");
    assert_eq!(
        load.config.metadata.scheduler_source,
        SchedulerConfigSource::Default
    );
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = loader(dir.path(), empty_env())
        .with_config_path("nope.toml")
        .load()
        .expect_err("missing file");
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_file_reports_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("batchline.toml"), "[server\nport = ").unwrap();

    let err = loader(dir.path(), empty_env()).load().expect_err("bad toml");
    assert!(matches!(err, ConfigLoadError::ParseToml { .. }));
}

#[test]
fn precedence_file_then_inline_then_env_then_cli() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("batchline.toml"),
        "[server]\nport = 7000\n\n[scheduler]\nrate_limit_interval_ms = 100\n",
    )
    .unwrap();

    let env = EnvSource::fixed([
        (
            "BATCHLINE_SCHEDULER_JSON",
            r#"{"rate_limit_interval_ms": 200, "processor": {"max_attempts": 3}}"#,
        ),
        ("SERVER_PORT", "7001"),
        ("PROCESSOR_TIMEOUT_MS", "1500"),
        ("RATE_LIMIT_INTERVAL_MS", "300"),
    ]);

    let load = loader(dir.path(), env.clone()).load().expect("load");
    let scheduler = &load.config.scheduler;
    assert_eq!(load.config.server.port, 7001);
    assert_eq!(scheduler.rate_limit_interval_ms, 300);
    assert_eq!(scheduler.processor.max_attempts, 3);
    assert_eq!(scheduler.processor.timeout_ms, Some(1_500));
    assert_eq!(
        load.config.metadata.scheduler_source,
        SchedulerConfigSource::EnvInline
    );

    let load = loader(dir.path(), env)
        .with_overrides(ConfigOverrides {
            host: Some("localhost".to_string()),
            port: Some(9000),
            rate_limit_interval_ms: Some(400),
        })
        .load()
        .expect("load");
    assert_eq!(load.config.bind_address(), "localhost:9000");
    assert_eq!(load.config.scheduler.rate_limit_interval_ms, 400);
}

#[test]
fn env_file_fills_unset_variables() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join(".env");
    fs::write(&env_file, "SERVER_PORT=6100\nSERVER_HOST=10.0.0.1\n").unwrap();

    let env = EnvSource::fixed([("SERVER_HOST", "192.168.1.1")]);
    let load = loader(dir.path(), env)
        .with_env_file(&env_file)
        .load()
        .expect("load");

    assert!(load.config.metadata.env_file_loaded);
    assert_eq!(load.config.server.port, 6100);
    assert_eq!(load.config.server.host, "192.168.1.1");
}

#[test]
fn invalid_env_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let env = EnvSource::fixed([("PROCESSOR_MAX_ATTEMPTS", "many")]);
    let err = loader(dir.path(), env).load().expect_err("bad value");
    assert!(matches!(
        err,
        ConfigLoadError::InvalidEnvVar {
            name: "PROCESSOR_MAX_ATTEMPTS",
            ..
        }
    ));
}

#[test]
fn guard_rails_run_on_the_merged_result() {
    let dir = TempDir::new().unwrap();
    let env = EnvSource::fixed([("PROCESSOR_MAX_ATTEMPTS", "0")]);
    let err = loader(dir.path(), env).load().expect_err("zero attempts");
    assert!(matches!(err, ConfigLoadError::GuardRail(_)));

    let env = EnvSource::fixed([("RATE_LIMIT_INTERVAL_MS", "0")]);
    let load = loader(dir.path(), env).load().expect("zero rate limit is allowed");
    assert_eq!(load.warnings.len(), 1);
}

#[test]
fn bad_inline_scheduler_json() {
    let dir = TempDir::new().unwrap();
    let env = EnvSource::fixed([("BATCHLINE_SCHEDULER_JSON", "{not json")]);
    let err = loader(dir.path(), env).load().expect_err("bad json");
    assert!(matches!(err, ConfigLoadError::InlineScheduler { .. }));
}
