use std::path::{Path, PathBuf};
use std::{fs, io};

use crate::models::AlarmRule;

#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error("rule file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("rule list serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Whole-list persistence for alarm rules.
///
/// Partial updates are not supported: every mutation rewrites the full list,
/// so the file is always one consistent snapshot and rule ids stay stable
/// across restarts.
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted rule list. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<AlarmRule>, RuleStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Rewrites the full rule list.
    pub fn save(&self, rules: &[AlarmRule]) -> Result<(), RuleStoreError> {
        let raw = serde_json::to_string_pretty(rules)?;
        fs::write(&self.path, raw)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use airwatch_api::SensorKind;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::models::Comparison;

    use super::*;

    fn temp_store() -> RuleStore {
        let path = std::env::temp_dir().join(format!("airwatch-rules-{}.json", Uuid::new_v4()));
        RuleStore::new(path)
    }

    #[test]
    fn missing_file_is_an_empty_list() {
        let store = temp_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_load_roundtrip_restores_runtime_state() {
        let store = temp_store();

        let mut rule = AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0)
            .with_email(Some("alert.json".into()));
        rule.state.triggered = true;
        rule.state.recovery_notified = false;
        rule.state.last_notification =
            Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());

        store.save(std::slice::from_ref(&rule)).unwrap();
        let restored = store.load().unwrap();

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id, rule.id);
        assert!(restored[0].state.triggered);
        assert!(!restored[0].state.recovery_notified);
        assert_eq!(
            restored[0].state.last_notification,
            rule.state.last_notification
        );

        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn save_rewrites_the_whole_list() {
        let store = temp_store();

        let first = AlarmRule::new(SensorKind::Noise, Comparison::Above, 70.0);
        let second = AlarmRule::new(SensorKind::Humidity, Comparison::Below, 25.0);

        store.save(&[first.clone(), second.clone()]).unwrap();
        store.save(std::slice::from_ref(&second)).unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id, second.id);

        fs::remove_file(store.path()).unwrap();
    }
}
