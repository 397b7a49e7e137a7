//! Externally supplied session strings for reconstructed recordings.
//!
//! A race recorded as a series of dumps carries only the session string of
//! its first dump. The host keeps the others as separate YAML files stamped
//! with the tick they were captured at, and hands them to the disk client as
//! an override queue.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Result, TelemetryError};

/// One tick-stamped session string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfoOverride {
    /// First `SessionTick` the string applies to
    pub tick: i32,
    pub file_name: String,
    pub yaml: String,
}

impl SessionInfoOverride {
    pub fn new(tick: i32, file_name: impl Into<String>, yaml: impl Into<String>) -> Self {
        Self { tick, file_name: file_name.into(), yaml: yaml.into() }
    }

    /// Read a dumped session string from `path`.
    pub fn from_file(tick: i32, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Ok(Self::new(tick, path.display().to_string(), yaml))
    }
}

/// Index of the override in effect at `tick`: the one with the largest tick
/// not after `tick`, or the first entry when every override lies ahead.
pub fn select_override(overrides: &[SessionInfoOverride], tick: i32) -> Option<usize> {
    if overrides.is_empty() {
        return None;
    }
    let best = overrides
        .iter()
        .enumerate()
        .filter(|(_, o)| o.tick <= tick)
        .max_by_key(|(idx, o)| (o.tick, std::cmp::Reverse(*idx)))
        .map(|(idx, _)| idx);
    Some(best.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn queue(ticks: &[i32]) -> Vec<SessionInfoOverride> {
        ticks.iter().map(|&t| SessionInfoOverride::new(t, format!("{t}.yaml"), "")).collect()
    }

    #[test]
    fn picks_latest_override_not_after_tick() {
        let overrides = queue(&[10, 50, 100]);
        assert_eq!(select_override(&overrides, 73), Some(1));
        assert_eq!(select_override(&overrides, 100), Some(2));
        assert_eq!(select_override(&overrides, 1_000), Some(2));
        assert_eq!(select_override(&overrides, 50), Some(1));
    }

    #[test]
    fn falls_back_to_first_entry() {
        let overrides = queue(&[10, 50, 100]);
        assert_eq!(select_override(&overrides, 5), Some(0));
        assert_eq!(select_override(&[], 5), None);
    }

    #[test]
    fn unsorted_queues_still_pick_by_tick() {
        let overrides = queue(&[100, 10, 50]);
        assert_eq!(select_override(&overrides, 73), Some(2));
        // fallback is positional, not the smallest tick
        assert_eq!(select_override(&overrides, 0), Some(0));
    }

    #[test]
    fn reads_override_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session_0300.yaml");
        std::fs::write(&path, "WeekendInfo:\n TrackName: spa\n")?;
        let loaded = SessionInfoOverride::from_file(300, &path)?;
        assert_eq!(loaded.tick, 300);
        assert!(loaded.file_name.ends_with("session_0300.yaml"));
        assert!(loaded.yaml.contains("TrackName"));

        let missing = SessionInfoOverride::from_file(0, dir.path().join("nope.yaml")).unwrap_err();
        assert_eq!(missing.kind(), crate::ErrorKind::NotFound);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_selected_override_is_latest_applicable(
            ticks in prop::collection::vec(0i32..1_000, 1..8),
            current in 0i32..1_200,
        ) {
            let overrides = queue(&ticks);
            let idx = select_override(&overrides, current).unwrap();
            let chosen = overrides[idx].tick;
            if ticks.iter().any(|&t| t <= current) {
                prop_assert!(chosen <= current);
                prop_assert!(ticks.iter().all(|&t| t > current || t <= chosen));
            } else {
                prop_assert_eq!(idx, 0);
            }
        }
    }
}
