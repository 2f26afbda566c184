use std::io::Write;

use clap::Parser;
use serial_test::serial;
use tagflush::config::{self, CliArgs, LoadError, LogFormat};
use tempfile::NamedTempFile;
use tracing::level_filters::LevelFilter;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".toml").expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn args(extra: &[&str]) -> CliArgs {
    let mut argv = vec!["tagflush"];
    argv.extend_from_slice(extra);
    argv.extend_from_slice(&["supertypes", "demos/replay.toml", "Text"]);
    CliArgs::parse_from(argv)
}

#[test]
#[serial]
fn file_settings_are_applied() {
    let file = config_file(
        r#"
[logging]
level = "warn"
json = true

[flusher]
show_invisible_content = false

[store]
capacity = 32
"#,
    );
    let path = file.path().to_str().expect("utf-8 path");

    let settings = config::load(&args(&["--config-file", path])).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert!(settings.flusher.enabled);
    assert!(!settings.flusher.show_invisible_content);
    assert!(settings.flusher.show_inaccessible_content);
    assert_eq!(settings.store.capacity.get(), 32);
}

#[test]
#[serial]
fn cli_beats_environment_beats_file() {
    let file = config_file("[store]\ncapacity = 32\n[flusher]\nenabled = true\n");
    let path = file.path().to_str().expect("utf-8 path");

    // SAFETY: tests touching the environment run serially.
    unsafe {
        std::env::set_var("TAGFLUSH__STORE__CAPACITY", "64");
        std::env::set_var("TAGFLUSH__FLUSHER__ENABLED", "false");
    }
    let from_env = config::load(&args(&["--config-file", path]));
    let from_cli = config::load(&args(&["--config-file", path, "--store-capacity", "128"]));
    unsafe {
        std::env::remove_var("TAGFLUSH__STORE__CAPACITY");
        std::env::remove_var("TAGFLUSH__FLUSHER__ENABLED");
    }

    let from_env = from_env.expect("env settings");
    assert_eq!(from_env.store.capacity.get(), 64);
    assert!(!from_env.flusher.enabled);
    assert_eq!(from_cli.expect("cli settings").store.capacity.get(), 128);
}

#[test]
#[serial]
fn invalid_file_values_are_rejected() {
    let file = config_file("[store]\ncapacity = 0\n");
    let path = file.path().to_str().expect("utf-8 path");

    let err = config::load(&args(&["--config-file", path])).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "store.capacity",
            ..
        }
    ));
}

#[test]
#[serial]
fn missing_config_file_fails() {
    let err = config::load(&args(&["--config-file", "/nonexistent/tagflush.toml"]))
        .expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}
