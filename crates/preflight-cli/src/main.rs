//! Pre-flight orchestrator for the SQL Assistant service.
//!
//! Invoked once per instance start by the platform's process supervisor.
//!
//! ## Commands
//!
//! - `run`: execute the full pre-flight sequence, then replace this
//!   process with the application server (the normal supervisor entry).
//! - `check`: run every diagnostic section and print a report; never
//!   hands off. For operators poking at a broken instance.
//! - `env`: show required/optional configuration with masked values.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use preflight_core::{
    display_value, exec_handoff, run_diagnostics, EnvSnapshot, PreflightConfig, PreflightSequence,
    OPTIONAL_VARS, REQUIRED_VARS,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "preflight")]
#[command(author = "SQL Assistant Platform Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pre-flight setup and handoff for the SQL Assistant service", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON (log lines and reports)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pre-flight sequence and hand off to the server
    Run {
        /// Project root the service is deployed under
        #[arg(long, env = "PREFLIGHT_ROOT", default_value = ".")]
        root: PathBuf,

        /// Skip dependency installation (image has them pre-baked)
        #[arg(long)]
        skip_install: bool,

        /// Interpreter used for package import probes
        #[arg(long, default_value = "python3")]
        interpreter: String,
    },

    /// Run diagnostics and print a report; never hands off
    Check {
        /// Project root the service is deployed under
        #[arg(long, env = "PREFLIGHT_ROOT", default_value = ".")]
        root: PathBuf,

        /// Interpreter used for package import probes
        #[arg(long, default_value = "python3")]
        interpreter: String,
    },

    /// Show configuration variables with masked values
    Env,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    preflight_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            root,
            skip_install,
            interpreter,
        } => cmd_run(root, skip_install, interpreter).await,
        Commands::Check { root, interpreter } => cmd_check(root, interpreter, cli.json).await,
        Commands::Env => cmd_env(),
    }
}

/// Run the sequence, then perform the terminal handoff.
///
/// On success this function never returns: the server replaces the
/// process. Every `Err` path maps to a non-zero exit naming the failing
/// step.
async fn cmd_run(root: PathBuf, skip_install: bool, interpreter: String) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("project root not accessible: {:?}", root))?;

    let mut config = PreflightConfig::new(root);
    config.skip_install = skip_install;
    config.interpreter = interpreter;

    let mut snapshot = EnvSnapshot::capture();

    let outcome = PreflightSequence::run(&config, &mut snapshot)
        .await
        .map_err(|e| anyhow::anyhow!("pre-flight step {} failed: {}", e.step(), e))?;

    for warning in &outcome.warnings {
        println!("⚠ {}", warning);
    }
    println!(
        "Pre-flight complete: {} steps in {}ms, handing off to {}",
        outcome.steps.len(),
        outcome.duration_ms,
        outcome.handoff.bind_addr()
    );

    // Terminal: returns only on launch failure.
    let err = exec_handoff(&outcome.handoff);
    Err(err.into())
}

/// Run diagnostics and report; exit non-zero if any section failed.
async fn cmd_check(root: PathBuf, interpreter: String, json: bool) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("project root not accessible: {:?}", root))?;

    let snapshot = EnvSnapshot::capture();
    let report = run_diagnostics(&root, &interpreter, &snapshot).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for section in &report.sections {
            let status = if section.passed { "✓" } else { "✗" };
            println!("{} {}", status, section.name);
            for finding in &section.findings {
                println!("    {}", finding);
            }
            if !section.passed {
                if let Some(hint) = section.hint {
                    println!("    hint: {}", hint);
                }
            }
            println!();
        }
        println!(
            "Summary: {}/{} sections passed",
            report.passed_count(),
            report.sections.len()
        );
    }

    if report.all_passed() {
        Ok(())
    } else {
        anyhow::bail!("{} diagnostic section(s) failed", report.failed_count())
    }
}

/// Show required and optional configuration with masked values.
fn cmd_env() -> Result<()> {
    let snapshot = EnvSnapshot::capture();

    println!("Required:");
    for spec in REQUIRED_VARS {
        match snapshot.get(spec.name) {
            Some(value) => println!(
                "  {}: {} ({})",
                spec.name,
                display_value(spec, value),
                spec.description
            ),
            None => println!("  {}: (not set) ({})", spec.name, spec.description),
        }
    }

    println!();
    println!("Optional:");
    for spec in OPTIONAL_VARS {
        match snapshot.get(spec.name) {
            Some(value) => println!(
                "  {}: {} ({})",
                spec.name,
                display_value(spec, value),
                spec.description
            ),
            None => println!("  {}: (not set) ({})", spec.name, spec.description),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_command_never_fails() {
        assert!(cmd_env().is_ok());
    }

    #[tokio::test]
    async fn test_check_fails_on_bare_instance() {
        let root = tempfile::tempdir().unwrap();

        // Nothing deployed, probes fail: check must exit non-zero but
        // still produce a complete report (no panic, no early abort).
        let result = cmd_check(root.path().to_path_buf(), "false".to_string(), false).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("diagnostic"));
    }

    #[tokio::test]
    async fn test_run_rejects_missing_root() {
        let result = cmd_run(
            PathBuf::from("/definitely/not/a/real/root"),
            true,
            "true".to_string(),
        )
        .await;
        assert!(result.is_err());
    }
}
