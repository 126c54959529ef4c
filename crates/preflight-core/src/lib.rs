//! Preflight Core Library
//!
//! Setup steps for bringing a freshly provisioned SQL Assistant instance
//! into a known-good state: environment preparation, directory
//! provisioning, dependency installation and verification, configuration
//! validation, an advisory connectivity probe, a health stamp, and the
//! terminal replace-process handoff to the server.
//!
//! The sequence itself lives in [`pipeline`]; everything downstream of the
//! handoff (the bot service, its web framework, the remote query function)
//! is an external collaborator and out of scope here.

pub mod check;
pub mod config;
pub mod dirs;
pub mod env;
pub mod error;
pub mod handoff;
pub mod health;
pub mod install;
pub mod pipeline;
pub mod probe;
pub mod telemetry;
pub mod verify;

pub use check::{run_diagnostics, CheckReport, CheckSection, SERVICE_FILES};
pub use config::{
    display_value, mask_sensitive, validate_config, ConfigReport, VarSpec, OPTIONAL_VARS,
    REQUIRED_VARS,
};
pub use dirs::{provision_dirs, DirSpec, SERVICE_DIRS};
pub use env::{BasePaths, EnvSnapshot, EnvironmentPreparer, SEARCH_PATH_VARS};
pub use error::{Result, SetupError};
pub use handoff::{exec_handoff, HandoffSpec, DEFAULT_BIND, DEFAULT_PORT};
pub use health::{write_stamp, HealthStamp, HEALTH_STAMP_FILE};
pub use install::{install_dependencies, InstallerSpec};
pub use pipeline::{PreflightConfig, PreflightOutcome, PreflightSequence, StepRecord};
pub use probe::{probe_function, ProbeOutcome, PROBE_EXPECTED_STATUS, PROBE_TIMEOUT_SECS};
pub use telemetry::init_tracing;
pub use verify::{verify_packages, PackageSpec, REQUIRED_PACKAGES};
