use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reconcile::{DatabaseModel, NewState, PermissionsGroupModel, ResourceKind, UserModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Default state file name, placed next to the manifest.
pub const DEFAULT_STATE: &str = "metabase.state.json";

/// Reconciled state of every managed resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderState {
    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    /// Last time the state was saved
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub permissions_group: BTreeMap<String, PermissionsGroupModel>,

    #[serde(default)]
    pub user: BTreeMap<String, UserModel>,

    #[serde(default)]
    pub database: BTreeMap<String, DatabaseModel>,
}

// ============================================================================
// ProviderState Implementation
// ============================================================================

impl ProviderState {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state serial {} from {}", state.serial, path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    /// Bump the serial and timestamp, then save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.last_updated = Utc::now();
        self.save(path)
    }

    /// Number of tracked resources
    pub fn len(&self) -> usize {
        self.permissions_group.len() + self.user.len() + self.database.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `label` is tracked for `kind`
    pub fn tracks(&self, kind: ResourceKind, label: &str) -> bool {
        match kind {
            ResourceKind::PermissionsGroup => self.permissions_group.contains_key(label),
            ResourceKind::User => self.user.contains_key(label),
            ResourceKind::Database => self.database.contains_key(label),
        }
    }
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            serial: 0,
            last_updated: Utc::now(),
            permissions_group: BTreeMap::new(),
            user: BTreeMap::new(),
            database: BTreeMap::new(),
        }
    }
}

/// Record the outcome of an operation in one kind's map.
///
/// Returns whether anything changed.
pub fn record<M: PartialEq>(
    slot: &mut BTreeMap<String, M>,
    label: &str,
    outcome: NewState<M>,
) -> bool {
    match outcome {
        NewState::Set(model) => {
            if slot.get(label) == Some(&model) {
                return false;
            }
            slot.insert(label.to_string(), model);
            true
        }
        NewState::Removed => slot.remove(label).is_some(),
        NewState::Retained => false,
    }
}

/// Where the state file lives: `--state` if given, else next to the manifest.
pub fn state_path(explicit: Option<&str>, manifest: &Path) -> PathBuf {
    match explicit {
        Some(path) => crate::manifest::expand_path(path),
        None => manifest
            .parent()
            .map_or_else(|| PathBuf::from(DEFAULT_STATE), |dir| dir.join(DEFAULT_STATE)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Attr;

    fn group(id: i64, name: &str) -> PermissionsGroupModel {
        PermissionsGroupModel {
            id: Attr::Value(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_default_state() {
        let state = ProviderState::default();
        assert!(state.is_empty());
        assert_eq!(state.serial, 0);
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProviderState::load(&dir.path().join("none.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_touch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = ProviderState::default();
        state
            .permissions_group
            .insert("analysts".into(), group(3, "Analysts"));
        let mut user = UserModel::new("ada@example.com");
        user.id = Attr::Value(100);
        user.first_name = Attr::Null;
        state.user.insert("ada".into(), user);
        state.touch(&path).unwrap();
        state.touch(&path).unwrap();

        let loaded = ProviderState::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded.permissions_group["analysts"], group(3, "Analysts"));
        assert_eq!(loaded.user["ada"].id, Attr::Value(100));
        assert!(loaded.tracks(ResourceKind::User, "ada"));
        assert!(!loaded.tracks(ResourceKind::Database, "ada"));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ProviderState::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }

    #[test]
    fn test_record_outcomes() {
        let mut slot = BTreeMap::new();
        assert!(record(&mut slot, "a", NewState::Set(group(3, "A"))));
        assert!(!record(&mut slot, "a", NewState::Set(group(3, "A"))));
        assert!(!record(&mut slot, "a", NewState::Retained));
        assert_eq!(slot.len(), 1);
        assert!(record(&mut slot, "a", NewState::<PermissionsGroupModel>::Removed));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_state_path_defaults_next_to_manifest() {
        let path = state_path(None, Path::new("/etc/mb/metabase.toml"));
        assert_eq!(path, PathBuf::from("/etc/mb/metabase.state.json"));
        let bare = state_path(None, Path::new("metabase.toml"));
        assert_eq!(bare, PathBuf::from("metabase.state.json"));
        let explicit = state_path(Some("/tmp/s.json"), Path::new("metabase.toml"));
        assert_eq!(explicit, PathBuf::from("/tmp/s.json"));
    }
}
