//! Post-install verification of required packages.
//!
//! Each package is probed by asking the service interpreter to import it,
//! so a partial or corrupt install fails here rather than at first request.
//! Policy: fail fast on the first unloadable package — a broken dependency
//! graph cascades, and a single symptom is enough for a developer to act.
//! (Configuration validation aggregates instead; that asymmetry is
//! intentional.)

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::error::{Result, SetupError};

/// A package the service cannot start without.
#[derive(Debug, Clone, Copy)]
pub struct PackageSpec {
    /// Logical name, used in error messages.
    pub name: &'static str,

    /// Module path handed to the import probe.
    pub probe: &'static str,

    /// What the package is for, echoed in diagnostics.
    pub description: &'static str,
}

/// Packages verified after installation, before handoff.
pub const REQUIRED_PACKAGES: &[PackageSpec] = &[
    PackageSpec {
        name: "aiohttp",
        probe: "aiohttp",
        description: "Web framework",
    },
    PackageSpec {
        name: "botbuilder-core",
        probe: "botbuilder.core",
        description: "Bot Framework SDK",
    },
    PackageSpec {
        name: "openai",
        probe: "openai",
        description: "Azure OpenAI client",
    },
    PackageSpec {
        name: "tiktoken",
        probe: "tiktoken",
        description: "Token counting",
    },
    PackageSpec {
        name: "gunicorn",
        probe: "gunicorn",
        description: "Application server",
    },
    PackageSpec {
        name: "pyodbc",
        probe: "pyodbc",
        description: "SQL database connector",
    },
    PackageSpec {
        name: "azure-identity",
        probe: "azure.identity",
        description: "Azure authentication",
    },
];

/// Per-probe wall-clock limit. Imports are fast; a hang means a broken
/// native extension.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe every package in order, stopping at the first failure.
pub async fn verify_packages(
    root: &Path,
    interpreter: &str,
    packages: &[PackageSpec],
) -> Result<()> {
    for package in packages {
        match probe_package(root, interpreter, package).await {
            Ok(()) => info!(package = package.name, "package loadable"),
            Err(cause) => {
                return Err(SetupError::DependencyVerification {
                    package: package.name.to_string(),
                    cause,
                });
            }
        }
    }
    Ok(())
}

/// Probe a single package. `Err` carries a human-readable cause; used
/// directly by diagnostics, which aggregates instead of failing fast.
pub async fn probe_package(
    root: &Path,
    interpreter: &str,
    package: &PackageSpec,
) -> std::result::Result<(), String> {
    probe_import(root, interpreter, package.probe).await
}

/// Ask the interpreter to import one module. `Err` carries the probe's
/// last stderr line.
async fn probe_import(root: &Path, interpreter: &str, module: &str) -> std::result::Result<(), String> {
    let child = Command::new(interpreter)
        .arg("-c")
        .arg(format!("import {}", module))
        .current_dir(root)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", interpreter, e))?;

    let output = tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("import probe timed out after {:?}", PROBE_TIMEOUT))?
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(stderr
            .lines()
            .last()
            .unwrap_or("import failed with no output")
            .trim()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `true`/`false` stand in for the interpreter: they ignore the probe
    // arguments and exit 0/1, exercising both verdicts without a real
    // runtime on the test host.

    #[tokio::test]
    async fn test_all_packages_loadable() {
        let result = verify_packages(Path::new("."), "true", REQUIRED_PACKAGES).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fails_fast_on_first_unloadable() {
        let err = verify_packages(Path::new("."), "false", REQUIRED_PACKAGES)
            .await
            .unwrap_err();
        match err {
            SetupError::DependencyVerification { package, .. } => {
                // First package in declaration order, not an aggregate.
                assert_eq!(package, REQUIRED_PACKAGES[0].name);
            }
            other => panic!("expected DependencyVerification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_interpreter_reported_as_cause() {
        let err = verify_packages(Path::new("."), "no-such-interpreter", REQUIRED_PACKAGES)
            .await
            .unwrap_err();
        match err {
            SetupError::DependencyVerification { cause, .. } => {
                assert!(cause.contains("failed to spawn"));
            }
            other => panic!("expected DependencyVerification, got {:?}", other),
        }
    }
}
