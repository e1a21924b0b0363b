//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the interrupt handler,
//! validates the roots and runs the reconciliation.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use robust_copy::cli::Args;
use robust_copy::config::{CONFIG_ENV, create_template_config, default_config_path, load_config};
use robust_copy::logging::init_tracing;
use robust_copy::output as out;
use robust_copy::{TransferEngine, sync};

/// Exit status used after Ctrl-C, matching shell convention for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config / --init-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }
    if args.init_config {
        let path = default_config_path()
            .context("Could not determine a config path; set ROBUST_COPY_CONFIG")?;
        create_template_config(&path)?;
        out::print_info(&format!("A template config was written to: {}", path.display()));
        return Ok(());
    }

    // XML config first, CLI flags on top.
    let mut cfg = load_config().inspect_err(|e| {
        out::print_error(&format!("Failed to load config: {e:#}"));
    })?;
    if let Some(raw) = args.log_level.as_deref()
        && !args.debug
        && args.effective_log_level().is_none()
    {
        out::print_warn(&format!("Ignoring unknown log level '{raw}'"));
    }
    args.apply_overrides(&mut cfg);

    let guard_opt = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json)
        .inspect_err(|e| out::print_error(&format!("Failed to initialize logging: {e}")))?;

    // Guard is dropped on SIGINT so buffered file logs reach disk before exit.
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            out::print_warn("Received interrupt; stopping. Re-run to resume remaining files.");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
        .context("failed to install signal handler")?;
    }

    debug!("Starting robust_copy: {:?}", args);

    let result = (|| -> Result<()> {
        cfg.validate()?;
        let mut engine = TransferEngine::new(cfg.transfer_settings());
        let report = sync::run(&cfg, &mut engine)?;
        info!(
            copied = report.transferred.len(),
            matching = report.matching.len(),
            mismatching = report.mismatching.len(),
            failed = report.failed.len(),
            "Finished"
        );
        Ok(())
    })();

    if let Err(e) = &result {
        error!(error = ?e, "Run failed");
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location() {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}\n",
            std::path::Path::new(&explicit).display()
        ));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default robust_copy config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run with --init-config to create a template.");
            }
        }
        None => out::print_error("Could not determine a default config path."),
    }
}
