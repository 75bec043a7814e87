//! Configuration file handling through the binary

use super::run_subqueue;
use std::fs;

#[test]
fn test_config_file_values_are_used() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pump.toml");
    fs::write(
        &path,
        r#"
channels = ["orders"]
messages = 7
mode = "pull"
"#,
    )
    .unwrap();

    let output = run_subqueue(&["--no-color", "--config", path.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("orders"));
    assert!(stdout.contains(" 7 "), "unexpected summary: {}", stdout);
}

#[test]
fn test_arguments_override_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pump.toml");
    fs::write(&path, "channels = [\"orders\"]\nmessages = 7\n").unwrap();

    let output = run_subqueue(&[
        "--no-color",
        "--config",
        path.to_str().unwrap(),
        "--messages",
        "3",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains(" 3 "), "unexpected summary: {}", stdout);
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");

    let output = run_subqueue(&["--config", missing.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_invalid_config_value_is_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pump.toml");
    fs::write(&path, "fail_every = 0\n").unwrap();

    let output = run_subqueue(&["--config", path.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("fail_every"));
}
