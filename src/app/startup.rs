//! Application startup: configuration, logging and the pump run

use crate::app::cli::Args;
use crate::app::pump::{run_pump, QueueSummary};
use crate::core::config::PumpConfig;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;

/// Entry point for the `subqueue` binary
pub fn startup() {
    let args = Args::parse();
    std::process::exit(run(args));
}

/// Run with parsed arguments and return the process exit code
pub fn run(args: Args) -> i32 {
    let (mut config, source) = match PumpConfig::discover(args.config_file.as_deref()) {
        Ok(found) => found,
        Err(e) => {
            // Logging is not configured yet
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    args.apply_to(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return 1;
    }

    let use_color = config
        .color
        .unwrap_or_else(|| std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    let log_file = config.log_file.as_ref().map(|p| p.to_string_lossy());
    if let Err(e) = init_logging(
        config.log_level.as_deref(),
        config.log_format,
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Error initializing logging: {}", e);
        return 1;
    }

    log::info!(
        "subqueue {} starting ({} mode)",
        crate::PACKAGE_VERSION,
        config.mode
    );
    if let Some(path) = source {
        log::debug!("Configuration loaded from {}", path.display());
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("FATAL: Could not start async runtime");
            log::debug!("DETAIL: {}", e);
            return 1;
        }
    };

    match runtime.block_on(run_pump(&config)) {
        Ok(summaries) => {
            print_summary(&summaries);
            if summaries.iter().all(|summary| summary.in_order) {
                0
            } else {
                log::error!("Messages were delivered out of order");
                1
            }
        }
        Err(e) => {
            log_error_with_context(&e, "Running message pump");
            1
        }
    }
}

fn print_summary(summaries: &[QueueSummary]) {
    println!(
        "{:<24} {:<8} {:>10} {:>9}  {}",
        "CHANNEL".bold(),
        "KIND".bold(),
        "DELIVERED".bold(),
        "FAILURES".bold(),
        "ORDER".bold()
    );
    for summary in summaries {
        let order = if summary.in_order {
            "ok".green()
        } else {
            "broken".red().bold()
        };
        println!(
            "{:<24} {:<8} {:>10} {:>9}  {}",
            summary.channel.to_string(),
            summary.channel.kind().to_string(),
            summary.delivered,
            summary.handler_failures,
            order
        );
    }
}
