//! Dependency manifest installation.
//!
//! Invokes the package manager to install the declared manifest into a
//! user-writable location. Optional: deployments with pre-baked
//! dependencies skip this step entirely. A non-zero exit or spawn failure
//! is fatal — nothing downstream can be trusted after a partial install.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::error::{Result, SetupError};

/// How the package manager is invoked.
#[derive(Debug, Clone)]
pub struct InstallerSpec {
    /// Package-manager executable.
    pub program: String,

    /// Dependency manifest, relative to the project root.
    pub manifest: PathBuf,

    /// Wall-clock limit for the whole install.
    pub timeout_secs: u64,
}

impl Default for InstallerSpec {
    fn default() -> Self {
        Self {
            program: "pip".to_string(),
            manifest: PathBuf::from("requirements.txt"),
            timeout_secs: 600,
        }
    }
}

impl InstallerSpec {
    /// Arguments for a user-scope install of the manifest.
    pub fn args(&self) -> Vec<String> {
        vec![
            "install".to_string(),
            "--user".to_string(),
            "-r".to_string(),
            self.manifest.to_string_lossy().into_owned(),
        ]
    }
}

/// Run the package manager against the manifest under `root`.
pub async fn install_dependencies(root: &Path, spec: &InstallerSpec) -> Result<()> {
    info!(program = %spec.program, manifest = %spec.manifest.display(), "installing dependencies");

    let child = Command::new(&spec.program)
        .args(spec.args())
        .current_dir(root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SetupError::Install(format!("failed to spawn {}: {}", spec.program, e)))?;

    let output = tokio::time::timeout(
        Duration::from_secs(spec.timeout_secs),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| {
        SetupError::Install(format!(
            "{} timed out after {} seconds",
            spec.program, spec.timeout_secs
        ))
    })?
    .map_err(|e| SetupError::Install(e.to_string()))?;

    if output.status.success() {
        info!("dependency install completed");
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SetupError::Install(format!(
            "{} exited with {}: {}",
            spec.program,
            output.status,
            stderr.lines().last().unwrap_or("no output").trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str) -> InstallerSpec {
        InstallerSpec {
            program: program.to_string(),
            ..InstallerSpec::default()
        }
    }

    #[test]
    fn test_args_install_into_user_scope() {
        let args = InstallerSpec::default().args();
        assert_eq!(args, vec!["install", "--user", "-r", "requirements.txt"]);
    }

    #[tokio::test]
    async fn test_install_succeeds_on_zero_exit() {
        // `true` ignores its arguments and exits 0.
        let result = install_dependencies(Path::new("."), &spec("true")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_install_fails_on_nonzero_exit() {
        let err = install_dependencies(Path::new("."), &spec("false"))
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::Install(_)));
    }

    #[tokio::test]
    async fn test_install_fails_on_missing_program() {
        let err = install_dependencies(Path::new("."), &spec("definitely-not-a-real-installer"))
            .await
            .unwrap_err();
        match err {
            SetupError::Install(msg) => assert!(msg.contains("failed to spawn")),
            other => panic!("expected Install, got {:?}", other),
        }
    }
}
