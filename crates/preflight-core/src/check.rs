//! Aggregate diagnostics for operators.
//!
//! Unlike the pre-flight sequence, diagnostics never fail fast: every
//! section runs to completion and the report carries all findings at
//! once, so an operator can see the whole state of an instance from a
//! single invocation. Nothing here mutates the instance and the handoff
//! is never attempted.

use std::path::Path;

use serde::Serialize;

use crate::config::{display_value, ConfigReport, OPTIONAL_VARS, REQUIRED_VARS};
use crate::env::EnvSnapshot;
use crate::probe::{probe_function, ProbeOutcome};
use crate::verify::{probe_package, REQUIRED_PACKAGES};

/// Entry files the service cannot start without.
pub const SERVICE_FILES: &[&str] = &[
    "app.py",
    "teams_sql_bot.py",
    "azure_openai_sql_translator.py",
    "autonomous_sql_explorer.py",
    "query_validator.py",
    "token_limiter.py",
    "requirements.txt",
];

/// One diagnostic section: a name, a verdict, per-item findings, and a
/// remediation hint shown on failure.
#[derive(Debug, Clone, Serialize)]
pub struct CheckSection {
    pub name: &'static str,
    pub passed: bool,
    pub findings: Vec<String>,
    pub hint: Option<&'static str>,
}

/// The full diagnostic report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub sections: Vec<CheckSection>,
}

impl CheckReport {
    pub fn passed_count(&self) -> usize {
        self.sections.iter().filter(|s| s.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.sections.iter().filter(|s| !s.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Run every diagnostic section and aggregate the findings.
pub async fn run_diagnostics(root: &Path, interpreter: &str, snapshot: &EnvSnapshot) -> CheckReport {
    let sections = vec![
        check_environment(snapshot),
        check_packages(root, interpreter).await,
        check_files(root),
        check_connectivity(snapshot).await,
    ];
    CheckReport { sections }
}

fn check_environment(snapshot: &EnvSnapshot) -> CheckSection {
    let report = ConfigReport::evaluate(snapshot, REQUIRED_VARS);
    let mut findings = Vec::new();

    for spec in REQUIRED_VARS {
        match snapshot.get(spec.name) {
            Some(value) => findings.push(format!(
                "✓ {}: {} ({})",
                spec.name,
                display_value(spec, value),
                spec.description
            )),
            None => findings.push(format!("✗ {}: NOT SET ({})", spec.name, spec.description)),
        }
    }
    for spec in OPTIONAL_VARS {
        match snapshot.get(spec.name) {
            Some(value) => findings.push(format!(
                "ℹ {}: {} ({})",
                spec.name,
                display_value(spec, value),
                spec.description
            )),
            None => findings.push(format!("ℹ {}: not set ({})", spec.name, spec.description)),
        }
    }

    CheckSection {
        name: "environment_variables",
        passed: report.missing.is_empty(),
        findings,
        hint: Some("Add the missing variables to the App Service configuration"),
    }
}

async fn check_packages(root: &Path, interpreter: &str) -> CheckSection {
    let mut findings = Vec::new();
    let mut passed = true;

    for package in REQUIRED_PACKAGES {
        match probe_package(root, interpreter, package).await {
            Ok(()) => findings.push(format!(
                "✓ {}: installed ({})",
                package.name, package.description
            )),
            Err(cause) => {
                passed = false;
                findings.push(format!(
                    "✗ {}: NOT LOADABLE ({}) - {}",
                    package.name, package.description, cause
                ));
            }
        }
    }

    CheckSection {
        name: "packages",
        passed,
        findings,
        hint: Some("Check requirements.txt and redeploy"),
    }
}

fn check_files(root: &Path) -> CheckSection {
    let mut findings = Vec::new();
    let mut passed = true;

    for file in SERVICE_FILES {
        if root.join(file).is_file() {
            findings.push(format!("✓ {}: found", file));
        } else {
            passed = false;
            findings.push(format!("✗ {}: NOT FOUND", file));
        }
    }

    CheckSection {
        name: "service_files",
        passed,
        findings,
        hint: Some("Make sure all service files are deployed to the project root"),
    }
}

async fn check_connectivity(snapshot: &EnvSnapshot) -> CheckSection {
    let (passed, finding) = match probe_function(snapshot).await {
        ProbeOutcome::Skipped => (true, "ℹ function endpoint not configured, probe skipped".to_string()),
        ProbeOutcome::Reachable { status } => {
            (true, format!("✓ function endpoint reachable (status {})", status))
        }
        ProbeOutcome::Unreachable { reason } => (false, format!("✗ {}", reason)),
    };

    CheckSection {
        name: "connectivity",
        passed,
        findings: vec![finding],
        hint: Some("Verify AZURE_FUNCTION_URL and the function key in the portal"),
    }
}
