//! Terminal handoff to the long-running application server.
//!
//! The orchestrator ends by replacing its own process image with the
//! server: one PID, one exit-code channel, no supervisory wrapper left
//! behind. [`exec_handoff`] therefore returns *only on failure* — after a
//! successful handoff the orchestrator's code never executes another
//! instruction.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::env::EnvSnapshot;
use crate::error::SetupError;

/// Fixed launch parameters for the service.
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

const LAUNCHER: &str = "gunicorn";
const WORKER_CLASS: &str = "aiohttp.GunicornWebWorker";
const WORKERS: u32 = 1;
const TIMEOUT_SECS: u64 = 600;
const ENTRY_POINT: &str = "app:APP";
const ACCESS_LOG: &str = "logs/access.log";
const ERROR_LOG: &str = "logs/error.log";

/// Everything needed to launch the server. Immutable once constructed and
/// consumed exactly once by [`exec_handoff`].
#[derive(Debug, Clone)]
pub struct HandoffSpec {
    /// Server launcher executable.
    pub program: String,

    /// Bind address.
    pub bind: String,

    /// Bind port. `PORT` from the snapshot overrides the default.
    pub port: u16,

    /// Worker count. One worker: the service multiplexes on its own
    /// async runtime.
    pub workers: u32,

    /// Worker class matching that runtime.
    pub worker_class: String,

    /// Request timeout handed to the server.
    pub timeout_secs: u64,

    /// Entry-point reference to the service's request-handling object.
    pub entry_point: String,

    /// Access and error log destinations, relative to the working dir.
    pub access_log: PathBuf,
    pub error_log: PathBuf,

    /// Working directory the server starts in.
    pub working_dir: PathBuf,
}

impl HandoffSpec {
    /// Build the launch spec for a project root, honouring a `PORT`
    /// override from the snapshot.
    pub fn from_snapshot(root: &Path, snapshot: &EnvSnapshot) -> Self {
        let port = match snapshot.get("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(port = raw, "PORT is not a valid port number, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            program: LAUNCHER.to_string(),
            bind: DEFAULT_BIND.to_string(),
            port,
            workers: WORKERS,
            worker_class: WORKER_CLASS.to_string(),
            timeout_secs: TIMEOUT_SECS,
            entry_point: ENTRY_POINT.to_string(),
            access_log: PathBuf::from(ACCESS_LOG),
            error_log: PathBuf::from(ERROR_LOG),
            working_dir: root.to_path_buf(),
        }
    }

    /// `address:port` the server binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Launcher arguments, in the order the server expects them.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--bind".to_string(),
            self.bind_addr(),
            "--worker-class".to_string(),
            self.worker_class.clone(),
            "--workers".to_string(),
            self.workers.to_string(),
            "--timeout".to_string(),
            self.timeout_secs.to_string(),
            "--access-logfile".to_string(),
            self.access_log.to_string_lossy().into_owned(),
            "--error-logfile".to_string(),
            self.error_log.to_string_lossy().into_owned(),
            self.entry_point.clone(),
        ]
    }
}

/// Replace the current process with the server.
///
/// Does not return on success: the server inherits this process's
/// identity, standard streams, and exit-code channel. The returned error
/// therefore only ever describes a launch failure (launcher missing or
/// not executable), which is distinct from a service-initiated shutdown —
/// on a clean shutdown this code is simply gone.
#[cfg(unix)]
pub fn exec_handoff(spec: &HandoffSpec) -> SetupError {
    use std::os::unix::process::CommandExt;

    info!(
        program = %spec.program,
        bind = %spec.bind_addr(),
        entry_point = %spec.entry_point,
        "handing off to server"
    );

    let err = std::process::Command::new(&spec.program)
        .args(spec.args())
        .current_dir(&spec.working_dir)
        .exec();

    SetupError::Handoff(format!("exec {} failed: {}", spec.program, err))
}

/// Fallback for non-Unix targets: spawn the server, wait, and exit with
/// its status. Still never returns on a successful launch.
#[cfg(not(unix))]
pub fn exec_handoff(spec: &HandoffSpec) -> SetupError {
    info!(
        program = %spec.program,
        bind = %spec.bind_addr(),
        entry_point = %spec.entry_point,
        "handing off to server"
    );

    let status = std::process::Command::new(&spec.program)
        .args(spec.args())
        .current_dir(&spec.working_dir)
        .status();

    match status {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => SetupError::Handoff(format!("launch of {} failed: {}", spec.program, err)),
    }
}
