//! Environment capture and search-path preparation.
//!
//! The process environment is read exactly once, at orchestrator start,
//! into an [`EnvSnapshot`]. Every later step reads configuration from the
//! snapshot rather than from ambient process state; the only writer is
//! [`EnvironmentPreparer`], which extends the search-path variables with
//! the platform base paths before anything else runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Search-path variables the preparer is allowed to extend.
pub const SEARCH_PATH_VARS: &[&str] = &["PATH", "PYTHONPATH", "LD_LIBRARY_PATH"];

/// Directory of the platform-provisioned interpreter environment,
/// relative to the project root.
pub const RUNTIME_ENV_DIR: &str = "antenv";

/// A point-in-time copy of the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the live process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Look up a variable. Empty values count as unset: the hosting
    /// platform materialises blank app settings as empty strings.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Whether a variable is set to a non-empty value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Write a variable into the snapshot.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl FromIterator<(String, String)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Platform-supplied base paths: the project root, the provisioned
/// interpreter environment, and the user-local package location.
#[derive(Debug, Clone)]
pub struct BasePaths {
    /// Root of the deployed service (entry files, manifests, working dirs).
    pub project_root: PathBuf,

    /// Interpreter environment provisioned by the platform's build step.
    pub runtime_home: PathBuf,

    /// Target of user-scope package installs.
    pub user_site: PathBuf,
}

impl BasePaths {
    /// Resolve base paths for a project root, reading `HOME` from the
    /// snapshot for the user-site location.
    pub fn resolve(project_root: PathBuf, snapshot: &EnvSnapshot) -> Self {
        let runtime_home = project_root.join(RUNTIME_ENV_DIR);
        let user_site = snapshot
            .get("HOME")
            .map(|h| Path::new(h).join(".local"))
            .unwrap_or_else(|| project_root.join(".local"));

        Self {
            project_root,
            runtime_home,
            user_site,
        }
    }
}

/// Establishes search paths for all subsequent steps and the handoff.
///
/// Pure configuration assembly, no failure mode.
pub struct EnvironmentPreparer;

impl EnvironmentPreparer {
    /// The segments prepended to each search-path variable.
    fn edits(paths: &BasePaths) -> Vec<(&'static str, Vec<PathBuf>)> {
        vec![
            (
                "PATH",
                vec![paths.runtime_home.join("bin"), paths.user_site.join("bin")],
            ),
            ("PYTHONPATH", vec![paths.project_root.clone()]),
            ("LD_LIBRARY_PATH", vec![paths.runtime_home.join("lib")]),
        ]
    }

    /// Prepend the platform segments onto the snapshot's search-path
    /// variables. Inherited entries are preserved at the tail; segments
    /// already present are not duplicated, so preparing twice yields the
    /// same values.
    pub fn prepare(snapshot: &mut EnvSnapshot, paths: &BasePaths) {
        for (var, segments) in Self::edits(paths) {
            let merged = prepend_segments(snapshot.get(var), &segments);
            debug!(var, value = %merged, "search path prepared");
            snapshot.set(var, merged);
        }
    }

    /// Export the prepared search-path variables to the process-wide
    /// environment, where child processes and the handoff observe them.
    pub fn export(snapshot: &EnvSnapshot) {
        for var in SEARCH_PATH_VARS {
            if let Some(value) = snapshot.get(var) {
                std::env::set_var(var, value);
            }
        }
    }
}

/// Join `segments` ahead of an existing search-path value, skipping
/// segments the value already contains.
fn prepend_segments(existing: Option<&str>, segments: &[PathBuf]) -> String {
    let current: Vec<&str> = existing
        .map(|v| v.split(':').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let mut parts: Vec<String> = Vec::new();
    for segment in segments {
        let segment = segment.to_string_lossy();
        if !current.contains(&segment.as_ref()) && !parts.iter().any(|p| p.as_str() == segment.as_ref()) {
            parts.push(segment.into_owned());
        }
    }
    parts.extend(current.iter().map(|s| s.to_string()));
    parts.join(":")
}
