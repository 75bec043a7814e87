//! End-to-end runs of the message pump

use super::run_subqueue;

#[test]
fn test_default_run_succeeds() {
    let output = run_subqueue(&["--no-color"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("CHANNEL"));
    assert!(stdout.contains("news"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_every_mode_with_patterns() {
    for mode in ["pull", "sync", "async"] {
        let output = run_subqueue(&[
            "--no-color",
            "--mode",
            mode,
            "--channel",
            "news.tech,news.sports",
            "--pattern",
            "news.*",
            "--messages",
            "25",
        ]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(output.status.success(), "mode {} failed: {}", mode, stdout);
        assert!(stdout.contains("pattern"), "mode {}: {}", mode, stdout);
        assert!(stdout.contains("50"), "pattern queue should see both channels");
    }
}

#[test]
fn test_injected_failures_do_not_fail_run() {
    let output = run_subqueue(&["--no-color", "--fail-every", "2", "--messages", "6"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains(" 3 "), "expected three failures: {}", stdout);
}

#[test]
fn test_invalid_pattern_exits_with_error() {
    let output = run_subqueue(&["--no-color", "--pattern", "news.[abc"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_version_shows_build_metadata() {
    let output = run_subqueue(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
