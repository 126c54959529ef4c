//! Working-directory provisioning.
//!
//! The service expects a handful of writable directories under the project
//! root for caches, exports, and logs. Creation is idempotent; a failure
//! to create or chmod is fatal (a read-only filesystem means nothing
//! downstream can persist state).

use std::path::Path;

use tracing::info;

use crate::error::{Result, SetupError};

/// A directory the service needs, relative to the project root.
#[derive(Debug, Clone, Copy)]
pub struct DirSpec {
    /// Path relative to the project root.
    pub rel_path: &'static str,

    /// Permission mode applied after creation.
    pub mode: u32,
}

/// Owner rwx, group/other rx.
const DIR_MODE: u32 = 0o755;

/// Directories provisioned for the service before handoff.
pub const SERVICE_DIRS: &[DirSpec] = &[
    DirSpec {
        rel_path: ".pattern_cache",
        mode: DIR_MODE,
    },
    DirSpec {
        rel_path: ".exploration_exports",
        mode: DIR_MODE,
    },
    DirSpec {
        rel_path: ".query_logs",
        mode: DIR_MODE,
    },
    DirSpec {
        rel_path: ".powerbi_cache",
        mode: DIR_MODE,
    },
    DirSpec {
        rel_path: ".token_usage",
        mode: DIR_MODE,
    },
    DirSpec {
        rel_path: "logs",
        mode: DIR_MODE,
    },
];

/// Create each directory if absent and apply its permission mode.
///
/// Idempotent: running twice against the same root yields the same end
/// state with no error.
pub fn provision_dirs(root: &Path, specs: &[DirSpec]) -> Result<()> {
    for spec in specs {
        let path = root.join(spec.rel_path);

        std::fs::create_dir_all(&path).map_err(|source| SetupError::Provisioning {
            path: path.clone(),
            source,
        })?;
        set_mode(&path, spec.mode).map_err(|source| SetupError::Provisioning {
            path: path.clone(),
            source,
        })?;

        info!(dir = spec.rel_path, "directory provisioned");
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
