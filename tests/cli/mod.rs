//! CLI Integration Test Modules

pub mod pump_run;
pub mod toml_config;

use std::process::{Command, Output};

/// Run the `subqueue` binary with `args`, isolated from any user config
pub fn run_subqueue(args: &[&str]) -> Output {
    let home = tempfile::TempDir::new().expect("temp home");
    Command::new(env!("CARGO_BIN_EXE_subqueue"))
        .args(args)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run subqueue")
}
