//! Declared configuration and reconciled state records.
//!
//! The same record type serves as plan input and as persisted state. In a
//! plan, computed attributes are usually [`Attr::Absent`]; after any
//! lifecycle operation every attribute is known.

use crate::value::Attr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named schedules; `None` is an explicitly unset schedule.
pub type ScheduleMap = BTreeMap<String, Option<ScheduleModel>>;

/// One sync schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleModel {
    /// "hourly", "daily", "weekly" or "monthly"
    #[serde(rename = "type")]
    pub schedule_type: String,
    /// Day of week
    #[serde(default)]
    pub day: Attr<String>,
    /// Frame within the month
    #[serde(default)]
    pub frame: Attr<String>,
    /// Hour of day
    #[serde(default)]
    pub hour: Attr<i64>,
    /// Minute of hour
    #[serde(default)]
    pub minute: Attr<i64>,
}

/// A managed database connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseModel {
    /// Database ID
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub id: Attr<i64>,
    /// Engine wire name; changing it replaces the database
    pub engine: String,
    /// Display name
    pub name: String,
    /// Features the engine supports
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub features: Attr<Vec<String>>,
    /// JSON object of public connection details
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub details: Attr<String>,
    /// JSON object of secret connection details
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub details_secure: Attr<String>,
    /// Sync schedules
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub schedules: Attr<ScheduleMap>,
}

impl DatabaseModel {
    /// A model with only engine and name set.
    pub fn new(engine: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Attr::Absent,
            engine: engine.into(),
            name: name.into(),
            features: Attr::Absent,
            details: Attr::Absent,
            details_secure: Attr::Absent,
            schedules: Attr::Absent,
        }
    }
}

/// A managed Metabase user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserModel {
    /// User ID
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub id: Attr<i64>,
    /// Login email
    pub email: String,
    /// First name
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub first_name: Attr<String>,
    /// Last name
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub last_name: Attr<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub common_name: Attr<String>,
    /// Preferred locale
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub locale: Attr<String>,
    /// Non-reserved group memberships
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub group_ids: Attr<Vec<i64>>,
    /// Signs in with Google
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub google_auth: Attr<bool>,
    /// Signs in with LDAP
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub ldap_auth: Attr<bool>,
    /// Not deactivated
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub is_active: Attr<bool>,
    /// Created the instance
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub is_installer: Attr<bool>,
    /// Has not dismissed the new-user tour
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub is_qbnewb: Attr<bool>,
    /// Administrator
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub is_superuser: Attr<bool>,
    /// Has invited another user
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub has_invited_second_user: Attr<bool>,
    /// Has created a question and a dashboard
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub has_question_and_dashboard: Attr<bool>,
    /// When the account was created
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub date_joined: Attr<String>,
    /// First sign-in
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub first_login: Attr<String>,
    /// Latest sign-in
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub last_login: Attr<String>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub updated_at: Attr<String>,
}

impl UserModel {
    /// A model with only the email set.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Clear every attribute Metabase computes, keeping declared ones.
    pub fn clear_computed(&mut self) {
        self.common_name = Attr::Absent;
        self.google_auth = Attr::Absent;
        self.ldap_auth = Attr::Absent;
        self.is_active = Attr::Absent;
        self.is_installer = Attr::Absent;
        self.is_qbnewb = Attr::Absent;
        self.has_invited_second_user = Attr::Absent;
        self.has_question_and_dashboard = Attr::Absent;
        self.date_joined = Attr::Absent;
        self.first_login = Attr::Absent;
        self.last_login = Attr::Absent;
        self.updated_at = Attr::Absent;
    }
}

/// A managed permissions group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionsGroupModel {
    /// Group ID
    #[serde(default, skip_serializing_if = "Attr::is_absent")]
    pub id: Attr<i64>,
    /// Group name
    pub name: String,
}

impl PermissionsGroupModel {
    /// A model with only the name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Attr::Absent,
            name: name.into(),
        }
    }
}

/// Read-only view of a database, with secret details removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Database ID
    pub id: i64,
    /// Engine wire name
    pub engine: String,
    /// Display name
    pub name: String,
    /// Features the engine supports
    pub features: Vec<String>,
    /// JSON object of public connection details
    pub details: Attr<String>,
    /// Sync schedules
    pub schedules: ScheduleMap,
}
