//! Manifest loading: the operator's declared configuration.
//!
//! ```toml
//! [provider]
//! host = "https://metabase.example.com"
//!
//! [permissions_group.analysts]
//! name = "Analysts"
//!
//! [user.ada]
//! email = "ada@example.com"
//! group_ids = [3]
//!
//! [database.warehouse]
//! engine = "postgres"
//! name = "Warehouse"
//! details = { host = "pg", port = 5432, dbname = "dw", user = "metabase" }
//! details_secure = { password = "secret" }
//! ```

use anyhow::{Context, Result, bail};
use reconcile::{Attr, DatabaseModel, PermissionsGroupModel, ResourceKind, UserModel};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ProviderConfig;

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "metabase.toml";

/// Connection details, written either as a JSON string or as a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DetailsDecl {
    Json(String),
    Table(Map<String, Value>),
}

impl DetailsDecl {
    fn into_json(self) -> Result<String> {
        match self {
            Self::Json(json) => Ok(json),
            Self::Table(table) => {
                serde_json::to_string(&table).context("Failed to encode details table")
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseDecl {
    engine: String,
    name: String,
    details: Option<DetailsDecl>,
    details_secure: Option<DetailsDecl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    provider: ProviderConfig,
    #[serde(default)]
    database: BTreeMap<String, DatabaseDecl>,
    #[serde(default)]
    user: BTreeMap<String, UserModel>,
    #[serde(default)]
    permissions_group: BTreeMap<String, PermissionsGroupModel>,
}

/// Declared configuration, keyed by label within each kind.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub provider: ProviderConfig,
    pub databases: BTreeMap<String, DatabaseModel>,
    pub users: BTreeMap<String, UserModel>,
    pub groups: BTreeMap<String, PermissionsGroupModel>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        log::debug!(
            "Loaded manifest {} ({} resources)",
            path.display(),
            manifest.len()
        );
        Ok(manifest)
    }

    /// Parse manifest text.
    pub fn parse(content: &str) -> Result<Self> {
        let file: ManifestFile = toml::from_str(content)?;

        let mut databases = BTreeMap::new();
        for (label, decl) in file.database {
            check_label(ResourceKind::Database, &label)?;
            let mut model = DatabaseModel::new(decl.engine, decl.name);
            model.details = declared_details(decl.details)
                .with_context(|| format!("database.{label}.details"))?;
            model.details_secure = declared_details(decl.details_secure)
                .with_context(|| format!("database.{label}.details_secure"))?;
            databases.insert(label, model);
        }
        for label in file.user.keys() {
            check_label(ResourceKind::User, label)?;
        }
        for label in file.permissions_group.keys() {
            check_label(ResourceKind::PermissionsGroup, label)?;
        }

        Ok(Self {
            provider: file.provider,
            databases,
            users: file.user,
            groups: file.permissions_group,
        })
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.databases.len() + self.users.len() + self.groups.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `label` is declared for `kind`.
    pub fn declares(&self, kind: ResourceKind, label: &str) -> bool {
        match kind {
            ResourceKind::Database => self.databases.contains_key(label),
            ResourceKind::User => self.users.contains_key(label),
            ResourceKind::PermissionsGroup => self.groups.contains_key(label),
        }
    }

    /// The same provider settings with nothing declared.
    pub fn emptied(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            ..Self::default()
        }
    }
}

fn declared_details(decl: Option<DetailsDecl>) -> Result<Attr<String>> {
    match decl {
        None => Ok(Attr::Absent),
        Some(decl) => decl.into_json().map(Attr::Value),
    }
}

fn check_label(kind: ResourceKind, label: &str) -> Result<()> {
    if label.is_empty() || label.contains('.') {
        bail!("Invalid label '{label}' for {kind}: labels must be non-empty and contain no '.'");
    }
    Ok(())
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[provider]
host = "http://localhost:3000"
api_key = "mb_123"

[permissions_group.analysts]
name = "Analysts"

[user.ada]
email = "ada@example.com"
first_name = "Ada"
group_ids = [3, 4]

[database.warehouse]
engine = "postgres"
name = "Warehouse"
details = { host = "pg", port = 5432, dbname = "dw", user = "metabase" }
details_secure = '{"password":"secret"}'
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.provider.api_key.as_deref(), Some("mb_123"));
        assert_eq!(manifest.groups["analysts"].name, "Analysts");

        let ada = &manifest.users["ada"];
        assert_eq!(ada.group_ids, Attr::Value(vec![3, 4]));
        assert!(ada.last_name.is_absent());
        assert!(ada.is_superuser.is_absent());
    }

    #[test]
    fn test_details_table_becomes_json() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let db = &manifest.databases["warehouse"];
        let details: Value = serde_json::from_str(db.details.value().unwrap()).unwrap();
        assert_eq!(details["port"], 5432);
        assert_eq!(
            db.details_secure,
            Attr::Value(r#"{"password":"secret"}"#.to_string())
        );
    }

    #[test]
    fn test_omitted_details_are_absent() {
        let manifest = Manifest::parse(
            r#"
[database.sample]
engine = "h2"
name = "Sample"
"#,
        )
        .unwrap();
        assert!(manifest.databases["sample"].details.is_absent());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = Manifest::parse(
            r#"
[database.sample]
engine = "h2"
name = "Sample"
detail = "typo"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.is_empty());
        assert!(!manifest.declares(ResourceKind::User, "ada"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
