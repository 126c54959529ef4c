//! Integration tests for the pre-flight sequence against a scratch root.
//!
//! The installer and the import probes are stood in for by `true`/`false`
//! so both verdicts are exercised without a service runtime on the test
//! host; the function endpoint uses an unresolvable host so the probe
//! fails fast without touching a real network.

use preflight_core::{
    EnvSnapshot, HealthStamp, PreflightConfig, PreflightSequence, SetupError, HEALTH_STAMP_FILE,
    SERVICE_DIRS,
};
use std::path::Path;

fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn full_snapshot() -> EnvSnapshot {
    snapshot(&[
        ("MICROSOFT_APP_ID", "11112222-3333-4444-5555-666677778888"),
        ("MICROSOFT_APP_PASSWORD", "app-password-long-enough"),
        ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
        ("AZURE_OPENAI_API_KEY", "0123456789abcdef0123456789abcdef"),
        ("AZURE_FUNCTION_URL", "https://fn.invalid/api/query"),
        ("AZURE_FUNCTION_KEY", "fnkey-fnkey-fnkey"),
    ])
}

fn config(root: &Path) -> PreflightConfig {
    let mut config = PreflightConfig::new(root.to_path_buf());
    config.installer.program = "true".to_string();
    config.interpreter = "true".to_string();
    config
}

fn read_stamp(root: &Path) -> HealthStamp {
    let content = std::fs::read_to_string(root.join(HEALTH_STAMP_FILE)).expect("stamp missing");
    serde_json::from_str(&content).expect("stamp not valid JSON")
}

/// Happy path: directories created, stamp written, handoff spec ready.
/// The unresolvable function endpoint only produces a warning.
#[tokio::test]
async fn test_sequence_reaches_handoff() {
    let root = tempfile::tempdir().unwrap();
    let mut snap = full_snapshot();

    let outcome = PreflightSequence::run(&config(root.path()), &mut snap)
        .await
        .expect("sequence failed");

    for spec in SERVICE_DIRS {
        assert!(
            root.path().join(spec.rel_path).is_dir(),
            "missing {}",
            spec.rel_path
        );
    }

    let stamp = read_stamp(root.path());
    assert_eq!(stamp.status, "deployed");

    assert_eq!(outcome.handoff.bind_addr(), "0.0.0.0:8000");
    assert_eq!(outcome.handoff.workers, 1);
    assert_eq!(outcome.handoff.timeout_secs, 600);
    assert_eq!(outcome.steps.len(), 7);

    // Unreachable endpoint: advisory warning, not an error.
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("connectivity probe:"));
}

/// One missing key aborts with exactly that key, before the stamp.
#[tokio::test]
async fn test_missing_key_aborts_without_stamp() {
    let root = tempfile::tempdir().unwrap();
    let mut snap = full_snapshot();
    snap.set("AZURE_OPENAI_API_KEY", "");

    let err = PreflightSequence::run(&config(root.path()), &mut snap)
        .await
        .unwrap_err();

    match err {
        SetupError::Configuration { missing } => {
            assert_eq!(missing, vec!["AZURE_OPENAI_API_KEY"]);
        }
        other => panic!("expected Configuration, got {:?}", other),
    }

    assert!(
        !root.path().join(HEALTH_STAMP_FILE).exists(),
        "stamp must not be written on a failed run"
    );
}

/// Several missing keys are reported together, not one per restart.
#[tokio::test]
async fn test_missing_subset_reported_together() {
    let root = tempfile::tempdir().unwrap();
    let mut snap = full_snapshot();
    snap.set("MICROSOFT_APP_PASSWORD", "");
    snap.set("AZURE_FUNCTION_KEY", "");

    let err = PreflightSequence::run(&config(root.path()), &mut snap)
        .await
        .unwrap_err();

    match err {
        SetupError::Configuration { missing } => {
            assert_eq!(missing, vec!["MICROSOFT_APP_PASSWORD", "AZURE_FUNCTION_KEY"]);
        }
        other => panic!("expected Configuration, got {:?}", other),
    }
}

/// A second run over the same root succeeds and refreshes the stamp.
#[tokio::test]
async fn test_rerun_is_idempotent_and_restamps() {
    let root = tempfile::tempdir().unwrap();
    let mut snap = full_snapshot();

    PreflightSequence::run(&config(root.path()), &mut snap)
        .await
        .expect("first run failed");
    let first = read_stamp(root.path());

    std::thread::sleep(std::time::Duration::from_millis(10));

    PreflightSequence::run(&config(root.path()), &mut snap)
        .await
        .expect("second run failed");
    let second = read_stamp(root.path());

    assert!(second.timestamp > first.timestamp);
}

/// A broken dependency graph fails on the first package, before any
/// configuration is inspected and before the stamp.
#[tokio::test]
async fn test_unloadable_package_fails_fast() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path());
    cfg.interpreter = "false".to_string();

    let err = PreflightSequence::run(&cfg, &mut full_snapshot())
        .await
        .unwrap_err();

    match err {
        SetupError::DependencyVerification { package, .. } => {
            assert_eq!(package, "aiohttp");
        }
        other => panic!("expected DependencyVerification, got {:?}", other),
    }
    assert!(!root.path().join(HEALTH_STAMP_FILE).exists());
}

/// A failing installer aborts before verification runs.
#[tokio::test]
async fn test_failed_install_aborts() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path());
    cfg.installer.program = "false".to_string();

    let err = PreflightSequence::run(&cfg, &mut full_snapshot())
        .await
        .unwrap_err();
    assert!(matches!(err, SetupError::Install(_)));
    assert_eq!(err.step(), "dependency_install");
}

/// A pre-baked image skips the installer and records the skip.
#[tokio::test]
async fn test_skip_install_recorded() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path());
    cfg.skip_install = true;
    // An installer that would fail proves the step never ran.
    cfg.installer.program = "false".to_string();

    let outcome = PreflightSequence::run(&cfg, &mut full_snapshot())
        .await
        .expect("sequence failed");

    let install = outcome
        .steps
        .iter()
        .find(|s| s.name == "dependency_install")
        .unwrap();
    assert!(install.skipped);
}
