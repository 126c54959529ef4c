//! Machine-readable deployment health stamp.
//!
//! Asserts that setup completed — not that the service is currently
//! healthy. Overwritten on every successful run; a write failure is a
//! warning, never fatal (the stamp is a diagnostic artifact, not a
//! functional prerequisite).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stamp location, relative to the project root.
pub const HEALTH_STAMP_FILE: &str = "health.json";

/// The persisted record: `{"status": "deployed", "timestamp": <UTC ISO-8601>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStamp {
    pub status: String,

    pub timestamp: DateTime<Utc>,
}

impl HealthStamp {
    /// A "deployed" stamp at the current UTC time.
    pub fn deployed_now() -> Self {
        Self::deployed_at(Utc::now())
    }

    /// A "deployed" stamp at a fixed timestamp (deterministic tests).
    pub fn deployed_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: "deployed".to_string(),
            timestamp,
        }
    }
}

/// Write the stamp under `root`, replacing any previous content.
pub fn write_stamp(root: &Path) -> std::io::Result<PathBuf> {
    let path = root.join(HEALTH_STAMP_FILE);
    let stamp = HealthStamp::deployed_now();
    std::fs::write(&path, serde_json::to_vec_pretty(&stamp)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stamp_serializes_iso8601_utc() {
        let stamp = HealthStamp::deployed_at("2026-08-06T12:00:00Z".parse().unwrap());
        let json = serde_json::to_string(&stamp).unwrap();
        assert!(json.contains(r#""status":"deployed""#));
        assert!(json.contains("2026-08-06T12:00:00Z"));
    }

    #[test]
    fn test_written_stamp_parses_back() {
        let root = tempdir().unwrap();

        let path = write_stamp(root.path()).expect("write failed");
        assert_eq!(path, root.path().join(HEALTH_STAMP_FILE));

        let content = std::fs::read_to_string(&path).unwrap();
        let stamp: HealthStamp = serde_json::from_str(&content).unwrap();
        assert_eq!(stamp.status, "deployed");
        // Round-trips as UTC.
        assert_eq!(stamp.timestamp.timezone(), Utc);
    }

    #[test]
    fn test_stamp_overwrites_and_advances() {
        let root = tempdir().unwrap();

        write_stamp(root.path()).unwrap();
        let first: HealthStamp =
            serde_json::from_str(&std::fs::read_to_string(root.path().join(HEALTH_STAMP_FILE)).unwrap())
                .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));

        write_stamp(root.path()).unwrap();
        let second: HealthStamp =
            serde_json::from_str(&std::fs::read_to_string(root.path().join(HEALTH_STAMP_FILE)).unwrap())
                .unwrap();

        assert!(second.timestamp > first.timestamp);
    }
}
