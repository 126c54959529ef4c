//! Error taxonomy for the pre-flight sequence.
//!
//! Every variant here is fatal: the sequence aborts and the process exits
//! non-zero with a message naming the failing step. The only non-fatal
//! outcome in the whole orchestrator is a connectivity-probe warning, which
//! is not an error at all (see [`crate::probe::ProbeOutcome`]).

use std::path::PathBuf;

/// Fatal errors produced by pre-flight steps.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// A working directory could not be created or chmod'd.
    #[error("failed to provision directory {path:?}: {source}")]
    Provisioning {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The package manager exited non-zero or could not be spawned.
    #[error("dependency installation failed: {0}")]
    Install(String),

    /// A required package failed its import probe. Carries the first
    /// failing package only; a broken dependency graph cascades, so more
    /// entries add no diagnostic value.
    #[error("package {package} is not loadable: {cause}")]
    DependencyVerification { package: String, cause: String },

    /// One or more required configuration variables are unset. Carries the
    /// complete missing set so the operator gets one remediation list.
    #[error("missing required configuration: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// The server launcher could not be exec'd. Distinguishable from a
    /// service-initiated shutdown: on a clean shutdown the orchestrator's
    /// code never runs again, so this variant is only ever constructed on
    /// launch failure.
    #[error("server handoff failed: {0}")]
    Handoff(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    /// The name of the step that produced this error, for exit messages.
    pub fn step(&self) -> &'static str {
        match self {
            SetupError::Provisioning { .. } => "directory_provisioning",
            SetupError::Install(_) => "dependency_install",
            SetupError::DependencyVerification { .. } => "package_verification",
            SetupError::Configuration { .. } => "config_validation",
            SetupError::Handoff(_) => "server_handoff",
            SetupError::Io(_) => "io",
        }
    }
}

/// Result type for pre-flight operations.
pub type Result<T> = std::result::Result<T, SetupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_lists_all_missing() {
        let err = SetupError::Configuration {
            missing: vec!["AZURE_OPENAI_API_KEY".into(), "AZURE_FUNCTION_KEY".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("AZURE_OPENAI_API_KEY"));
        assert!(msg.contains("AZURE_FUNCTION_KEY"));
    }

    #[test]
    fn test_verification_error_names_package() {
        let err = SetupError::DependencyVerification {
            package: "tiktoken".into(),
            cause: "No module named 'tiktoken'".into(),
        };
        assert!(err.to_string().contains("tiktoken"));
        assert_eq!(err.step(), "package_verification");
    }

    #[test]
    fn test_step_names() {
        let err = SetupError::Handoff("gunicorn: No such file or directory".into());
        assert_eq!(err.step(), "server_handoff");

        let err = SetupError::Install("exit status 1".into());
        assert_eq!(err.step(), "dependency_install");
    }
}
