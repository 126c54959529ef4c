//! The pre-flight sequence.
//!
//! Strictly linear: each step either succeeds and flows to the next or
//! aborts the run with a [`SetupError`]. The two advisory steps
//! (connectivity probe, health stamp) downgrade their failures to
//! warnings. The sequence ends by *constructing* the handoff spec; the
//! binary performs the actual exec so that tests and diagnostics can run
//! the sequence without giving up the process.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::validate_config;
use crate::dirs::{provision_dirs, SERVICE_DIRS};
use crate::env::{BasePaths, EnvSnapshot, EnvironmentPreparer};
use crate::error::Result;
use crate::handoff::HandoffSpec;
use crate::health::write_stamp;
use crate::install::{install_dependencies, InstallerSpec};
use crate::probe::{probe_function, ProbeOutcome};
use crate::verify::{verify_packages, REQUIRED_PACKAGES};

/// Knobs for one pre-flight run.
#[derive(Debug, Clone)]
pub struct PreflightConfig {
    /// Project root the service is deployed under.
    pub root: PathBuf,

    /// Skip the installer when dependencies are pre-baked into the image.
    pub skip_install: bool,

    /// Package-manager invocation.
    pub installer: InstallerSpec,

    /// Interpreter used for import probes.
    pub interpreter: String,
}

impl PreflightConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            skip_install: false,
            installer: InstallerSpec::default(),
            interpreter: "python3".to_string(),
        }
    }
}

/// One completed (or skipped) step, for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: &'static str,
    pub duration_ms: u64,
    pub skipped: bool,
}

/// Result of a successful sequence: everything validated, stamp written,
/// handoff spec ready for the terminal exec.
#[derive(Debug)]
pub struct PreflightOutcome {
    /// Steps in execution order.
    pub steps: Vec<StepRecord>,

    /// Advisory failures that did not abort the run.
    pub warnings: Vec<String>,

    /// Launch spec for the server, consumed once by the caller.
    pub handoff: HandoffSpec,

    pub duration_ms: u64,
}

/// The orchestrator.
pub struct PreflightSequence;

impl PreflightSequence {
    /// Run the full sequence against `snapshot`.
    ///
    /// The snapshot is mutated once, by environment preparation; every
    /// later step only reads it.
    pub async fn run(
        config: &PreflightConfig,
        snapshot: &mut EnvSnapshot,
    ) -> Result<PreflightOutcome> {
        let run_started = Instant::now();
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let record = |steps: &mut Vec<StepRecord>, name, started: Instant, skipped| {
            steps.push(StepRecord {
                name,
                duration_ms: started.elapsed().as_millis() as u64,
                skipped,
            });
        };

        info!(root = %config.root.display(), "starting pre-flight sequence");

        let started = Instant::now();
        let paths = BasePaths::resolve(config.root.clone(), snapshot);
        EnvironmentPreparer::prepare(snapshot, &paths);
        EnvironmentPreparer::export(snapshot);
        record(&mut steps, "environment_preparation", started, false);

        let started = Instant::now();
        provision_dirs(&config.root, SERVICE_DIRS)?;
        record(&mut steps, "directory_provisioning", started, false);

        let started = Instant::now();
        if config.skip_install {
            info!("dependency install skipped (pre-baked image)");
            record(&mut steps, "dependency_install", started, true);
        } else {
            install_dependencies(&config.root, &config.installer).await?;
            record(&mut steps, "dependency_install", started, false);
        }

        let started = Instant::now();
        verify_packages(&config.root, &config.interpreter, REQUIRED_PACKAGES).await?;
        record(&mut steps, "package_verification", started, false);

        let started = Instant::now();
        validate_config(snapshot)?;
        record(&mut steps, "config_validation", started, false);

        let started = Instant::now();
        match probe_function(snapshot).await {
            ProbeOutcome::Skipped => {
                record(&mut steps, "connectivity_probe", started, true);
            }
            ProbeOutcome::Reachable { .. } => {
                record(&mut steps, "connectivity_probe", started, false);
            }
            ProbeOutcome::Unreachable { reason } => {
                warnings.push(format!("connectivity probe: {}", reason));
                record(&mut steps, "connectivity_probe", started, false);
            }
        }

        let started = Instant::now();
        match write_stamp(&config.root) {
            Ok(path) => info!(path = %path.display(), "health stamp written"),
            Err(e) => {
                warn!(error = %e, "health stamp could not be written");
                warnings.push(format!("health stamp: {}", e));
            }
        }
        record(&mut steps, "health_stamp", started, false);

        let handoff = HandoffSpec::from_snapshot(&config.root, snapshot);
        info!(
            bind = %handoff.bind_addr(),
            warnings = warnings.len(),
            "pre-flight sequence complete, ready for handoff"
        );

        Ok(PreflightOutcome {
            steps,
            warnings,
            handoff,
            duration_ms: run_started.elapsed().as_millis() as u64,
        })
    }
}
