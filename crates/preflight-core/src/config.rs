//! Required-configuration validation and masked display.
//!
//! Validation evaluates the *entire* requirement list before deciding, so a
//! failure carries every missing name at once: the operator fixes the full
//! set in one remediation cycle instead of rediscovering one variable per
//! restart. This is deliberately the opposite of the package verifier's
//! fail-fast policy.

use tracing::{info, warn};

use crate::env::EnvSnapshot;
use crate::error::{Result, SetupError};

/// A configuration variable the service reads at runtime.
#[derive(Debug, Clone, Copy)]
pub struct VarSpec {
    pub name: &'static str,

    /// Operator-facing description, echoed in reports.
    pub description: &'static str,

    /// Unset required variables abort the run.
    pub required: bool,

    /// Sensitive values are masked in any display.
    pub sensitive: bool,
}

/// Variables the run aborts without.
pub const REQUIRED_VARS: &[VarSpec] = &[
    VarSpec {
        name: "MICROSOFT_APP_ID",
        description: "Bot Framework App ID",
        required: true,
        sensitive: false,
    },
    VarSpec {
        name: "MICROSOFT_APP_PASSWORD",
        description: "Bot Framework Password",
        required: true,
        sensitive: true,
    },
    VarSpec {
        name: "AZURE_OPENAI_ENDPOINT",
        description: "Azure OpenAI Endpoint",
        required: true,
        sensitive: false,
    },
    VarSpec {
        name: "AZURE_OPENAI_API_KEY",
        description: "Azure OpenAI API Key",
        required: true,
        sensitive: true,
    },
    VarSpec {
        name: "AZURE_FUNCTION_URL",
        description: "SQL Function URL",
        required: true,
        sensitive: false,
    },
    VarSpec {
        name: "AZURE_FUNCTION_KEY",
        description: "SQL Function Key",
        required: true,
        sensitive: true,
    },
];

/// Variables that are reported but never fatal.
pub const OPTIONAL_VARS: &[VarSpec] = &[
    VarSpec {
        name: "MCP_SERVER_URL",
        description: "MCP Server URL",
        required: false,
        sensitive: false,
    },
    VarSpec {
        name: "DEPLOYMENT_ENV",
        description: "Deployment environment",
        required: false,
        sensitive: false,
    },
    VarSpec {
        name: "AZURE_OPENAI_DEPLOYMENT_NAME",
        description: "OpenAI deployment name",
        required: false,
        sensitive: false,
    },
    VarSpec {
        name: "MAX_DAILY_TOKENS",
        description: "Daily token limit",
        required: false,
        sensitive: false,
    },
    VarSpec {
        name: "PORT",
        description: "Application port",
        required: false,
        sensitive: false,
    },
];

/// Outcome of evaluating a requirement list against the snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConfigReport {
    /// Present variables with display-safe (masked/truncated) values.
    pub present: Vec<(&'static str, String)>,

    /// Names of unset variables, in spec order.
    pub missing: Vec<String>,
}

impl ConfigReport {
    /// Evaluate every spec in `specs` against the snapshot. Never
    /// short-circuits: the full list is partitioned before any decision.
    pub fn evaluate(snapshot: &EnvSnapshot, specs: &[VarSpec]) -> Self {
        let mut report = ConfigReport::default();
        for spec in specs {
            match snapshot.get(spec.name) {
                Some(value) => report.present.push((spec.name, display_value(spec, value))),
                None => report.missing.push(spec.name.to_string()),
            }
        }
        report
    }
}

/// Validate the required configuration.
///
/// Echoes present values (masked) and optional-variable status at info
/// level, then fails with the complete missing set if any required entry
/// is unset.
pub fn validate_config(snapshot: &EnvSnapshot) -> Result<ConfigReport> {
    let report = ConfigReport::evaluate(snapshot, REQUIRED_VARS);

    for (name, shown) in &report.present {
        info!(var = name, value = %shown, "configuration present");
    }
    for spec in OPTIONAL_VARS {
        match snapshot.get(spec.name) {
            Some(value) => info!(var = spec.name, value = %display_value(spec, value), "optional configuration set"),
            None => info!(var = spec.name, "optional configuration not set"),
        }
    }

    if report.missing.is_empty() {
        Ok(report)
    } else {
        warn!(missing = ?report.missing, "required configuration is incomplete");
        Err(SetupError::Configuration {
            missing: report.missing,
        })
    }
}

/// Mask a secret: first four and last four characters survive, everything
/// in between collapses. Short secrets collapse entirely.
pub fn mask_sensitive(value: &str) -> String {
    if value.len() > 8 {
        format!("{}***{}", &value[..4], &value[value.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Display-safe rendering of a value: masked when sensitive, otherwise
/// truncated to a 30-character prefix.
pub fn display_value(spec: &VarSpec, value: &str) -> String {
    if spec.sensitive {
        mask_sensitive(value)
    } else if value.len() > 30 {
        format!("{}...", &value[..30])
    } else {
        value.to_string()
    }
}
