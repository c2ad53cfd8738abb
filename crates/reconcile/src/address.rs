//! Resource addresses of the form `kind.label`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing an address or target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Kind is not one of the managed kinds
    #[error("unknown resource kind '{0}' (expected database, user or permissions_group)")]
    UnknownKind(String),

    /// Address has no label part
    #[error("address '{0}' must be of the form <kind>.<label>")]
    MissingLabel(String),

    /// Label part is empty or contains a dot
    #[error("invalid label in address '{0}'")]
    InvalidLabel(String),
}

/// The kinds of object under management.
///
/// Variant order is creation order: groups must exist before users refer
/// to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// `permissions_group`
    PermissionsGroup,
    /// `user`
    User,
    /// `database`
    Database,
}

impl ResourceKind {
    /// Every kind, in creation order.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::PermissionsGroup,
        ResourceKind::User,
        ResourceKind::Database,
    ];

    /// Name used in manifests, state and addresses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionsGroup => "permissions_group",
            Self::User => "user",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissions_group" | "group" => Ok(Self::PermissionsGroup),
            "user" => Ok(Self::User),
            "database" | "db" => Ok(Self::Database),
            other => Err(AddressError::UnknownKind(other.to_string())),
        }
    }
}

/// One managed resource, e.g. `user.ada`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    /// Resource kind
    pub kind: ResourceKind,
    /// Local label from the manifest
    pub label: String,
}

impl Address {
    /// Create an address.
    pub fn new(kind: ResourceKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.label)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, label) = s
            .split_once('.')
            .ok_or_else(|| AddressError::MissingLabel(s.to_string()))?;
        if label.is_empty() || label.contains('.') {
            return Err(AddressError::InvalidLabel(s.to_string()));
        }
        Ok(Self::new(kind.parse()?, label))
    }
}

/// A filter over addresses: a whole kind or a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Kind to match
    pub kind: ResourceKind,
    /// Label to match; any label when `None`
    pub label: Option<String>,
}

impl Target {
    /// Whether `address` is selected.
    pub fn matches(&self, address: &Address) -> bool {
        address.kind == self.kind && self.label.as_ref().is_none_or(|l| *l == address.label)
    }
}

impl FromStr for Target {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            None => Ok(Self {
                kind: s.parse()?,
                label: None,
            }),
            Some(_) => {
                let address: Address = s.parse()?;
                Ok(Self {
                    kind: address.kind,
                    label: Some(address.label),
                })
            }
        }
    }
}
