//! Domain objects exchanged with the Metabase API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved "All Users" group. Every user is implicitly a member.
pub const GROUP_ALL_USERS: i64 = 1;
/// Reserved "Administrators" group. Superusers are implicitly members.
pub const GROUP_ADMINISTRATORS: i64 = 2;

/// Flat connection-details bag for a database.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Named schedule settings; a `None` entry is an explicitly unset schedule.
pub type Schedules = BTreeMap<String, Option<ScheduleSettings>>;

/// Schedule name for metadata synchronisation.
pub const SCHEDULE_METADATA_SYNC: &str = "metadata_sync";
/// Schedule name for field value caching.
pub const SCHEDULE_CACHE_FIELD_VALUES: &str = "cache_field_values";

// ============================================================================
// Databases
// ============================================================================

/// Database engines Metabase ships drivers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// Amazon Athena
    Athena,
    /// Google BigQuery
    BigQuery,
    /// Google BigQuery (cloud SDK driver)
    BigQueryCloudSdk,
    /// Apache Druid
    Druid,
    /// Google Analytics
    GoogleAnalytics,
    /// H2
    H2,
    /// MongoDB
    Mongo,
    /// MySQL / MariaDB
    MySql,
    /// Oracle
    Oracle,
    /// PostgreSQL
    Postgres,
    /// Presto (JDBC driver)
    PrestoJdbc,
    /// Presto (deprecated driver)
    Presto,
    /// Amazon Redshift
    Redshift,
    /// Snowflake
    Snowflake,
    /// Spark SQL
    SparkSql,
    /// Microsoft SQL Server
    SqlServer,
    /// SQLite
    Sqlite,
}

impl Engine {
    /// All engines, in allow-list order.
    pub const ALL: [Engine; 17] = [
        Engine::Athena,
        Engine::BigQuery,
        Engine::BigQueryCloudSdk,
        Engine::Druid,
        Engine::GoogleAnalytics,
        Engine::H2,
        Engine::Mongo,
        Engine::MySql,
        Engine::Oracle,
        Engine::Postgres,
        Engine::PrestoJdbc,
        Engine::Presto,
        Engine::Redshift,
        Engine::Snowflake,
        Engine::SparkSql,
        Engine::SqlServer,
        Engine::Sqlite,
    ];

    /// Wire name of the engine.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Athena => "athena",
            Engine::BigQuery => "bigquery",
            Engine::BigQueryCloudSdk => "bigquery-cloud-sdk",
            Engine::Druid => "druid",
            Engine::GoogleAnalytics => "googleanalytics",
            Engine::H2 => "h2",
            Engine::Mongo => "mongo",
            Engine::MySql => "mysql",
            Engine::Oracle => "oracle",
            Engine::Postgres => "postgres",
            Engine::PrestoJdbc => "presto-jdbc",
            Engine::Presto => "presto",
            Engine::Redshift => "redshift",
            Engine::Snowflake => "snowflake",
            Engine::SparkSql => "sparksql",
            Engine::SqlServer => "sqlserver",
            Engine::Sqlite => "sqlite",
        }
    }

    /// Look up an engine by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How often a schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    /// Every hour
    Hourly,
    /// Once a day
    Daily,
    /// Once a week
    Weekly,
    /// Once a month
    Monthly,
}

impl ScheduleType {
    /// Wire name of the schedule type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Hourly => "hourly",
            ScheduleType::Daily => "daily",
            ScheduleType::Weekly => "weekly",
            ScheduleType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings for one named sync schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Frequency
    #[serde(rename = "schedule_type")]
    pub schedule_type: ScheduleType,
    /// Day of week ("mon", "tue", ...)
    #[serde(rename = "schedule_day", default)]
    pub day: Option<String>,
    /// Frame within the month ("first", "mid", "last")
    #[serde(rename = "schedule_frame", default)]
    pub frame: Option<String>,
    /// Hour of day
    #[serde(rename = "schedule_hour", default)]
    pub hour: Option<i64>,
    /// Minute of hour
    #[serde(rename = "schedule_minute", default)]
    pub minute: Option<i64>,
}

/// A database connection as reported by Metabase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Database ID
    pub id: i64,
    /// Display name
    pub name: String,
    /// Engine wire name
    pub engine: String,
    /// Features the engine supports
    #[serde(default)]
    pub features: Vec<String>,
    /// Connection details; secret values come back redacted
    #[serde(default)]
    pub details: Option<Details>,
    /// Sync schedules; absent when the engine has no scheduling support
    #[serde(default)]
    pub schedules: Option<Schedules>,
    /// Whether this is the bundled sample database
    #[serde(default)]
    pub is_sample: bool,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Full-replace request body for creating or updating a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRequest {
    /// Engine wire name
    pub engine: String,
    /// Display name
    pub name: String,
    /// Connection details
    pub details: Details,
    /// Sync schedules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Schedules>,
}

// ============================================================================
// Users
// ============================================================================

/// A user's membership of a permissions group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Group ID
    pub id: i64,
}

impl GroupMembership {
    /// Membership of the group with the given ID.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// A Metabase user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: i64,
    /// Login email
    pub email: String,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Display name
    #[serde(default)]
    pub common_name: Option<String>,
    /// Preferred locale
    #[serde(default)]
    pub locale: Option<String>,
    /// Group memberships, reserved groups included
    #[serde(default, rename = "user_group_memberships")]
    pub group_memberships: Vec<GroupMembership>,
    /// Membership IDs as reported by older Metabase versions
    #[serde(default, rename = "group_ids", skip_serializing)]
    pub legacy_group_ids: Vec<i64>,
    /// Signs in with Google
    #[serde(default)]
    pub google_auth: bool,
    /// Signs in with LDAP
    #[serde(default)]
    pub ldap_auth: bool,
    /// Not deactivated
    #[serde(default)]
    pub is_active: bool,
    /// Created the instance
    #[serde(default)]
    pub is_installer: Option<bool>,
    /// Has not dismissed the new-user tour
    #[serde(default)]
    pub is_qbnewb: bool,
    /// Administrator
    #[serde(default)]
    pub is_superuser: bool,
    /// Has invited another user
    #[serde(default)]
    pub has_invited_second_user: bool,
    /// Has created a question and a dashboard
    #[serde(default)]
    pub has_question_and_dashboard: bool,
    /// When the account was created
    #[serde(default)]
    pub date_joined: Option<String>,
    /// First sign-in
    #[serde(default)]
    pub first_login: Option<String>,
    /// Latest sign-in
    #[serde(default)]
    pub last_login: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    /// IDs of every group the user belongs to, in API order.
    #[must_use]
    pub fn group_ids(&self) -> Vec<i64> {
        if self.group_memberships.is_empty() {
            return self.legacy_group_ids.clone();
        }
        self.group_memberships.iter().map(|m| m.id).collect()
    }
}

/// Request body for `POST /api/user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreateRequest {
    /// Login email
    pub email: String,
    /// First name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Initial group memberships
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group_memberships: Option<Vec<GroupMembership>>,
}

/// Request body for `PUT /api/user/:id`.
///
/// Names and `locale` are always sent so that a null clears them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    /// Login email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Preferred locale
    #[serde(default)]
    pub locale: Option<String>,
    /// Administrator flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
    /// Complete membership list, reserved groups included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group_memberships: Option<Vec<GroupMembership>>,
}

// ============================================================================
// Permissions groups
// ============================================================================

/// A permissions group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsGroup {
    /// Group ID
    pub id: i64,
    /// Group name
    pub name: String,
    /// Number of members, when reported
    #[serde(default)]
    pub member_count: Option<i64>,
}

/// Request body for creating or renaming a permissions group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsGroupRequest {
    /// Group name
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_name() {
        assert_eq!(Engine::from_name("postgres"), Some(Engine::Postgres));
        assert_eq!(Engine::from_name("presto-jdbc"), Some(Engine::PrestoJdbc));
        assert_eq!(Engine::from_name("cockroach"), None);
    }

    #[test]
    fn test_engine_names_are_unique() {
        let mut names: Vec<_> = Engine::ALL.iter().map(Engine::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Engine::ALL.len());
    }

    #[test]
    fn test_user_memberships_from_objects() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 7,
            "email": "a@example.com",
            "user_group_memberships": [{"id": 1}, {"id": 4, "is_group_manager": false}],
            "is_active": true
        }))
        .unwrap();
        assert_eq!(user.group_ids(), vec![1, 4]);
        assert!(user.first_name.is_none());
    }

    #[test]
    fn test_user_memberships_from_legacy_ids() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 7,
            "email": "a@example.com",
            "group_ids": [1, 2, 9]
        }))
        .unwrap();
        assert_eq!(user.group_ids(), vec![1, 2, 9]);
    }

    #[test]
    fn test_schedule_settings_wire_names() {
        let settings: ScheduleSettings = serde_json::from_value(serde_json::json!({
            "schedule_type": "daily",
            "schedule_hour": 3,
            "schedule_day": null
        }))
        .unwrap();
        assert_eq!(settings.schedule_type, ScheduleType::Daily);
        assert_eq!(settings.hour, Some(3));
        assert!(settings.minute.is_none());
    }

    #[test]
    fn test_update_request_always_sends_clearable_fields() {
        let body = serde_json::to_value(UserUpdateRequest::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"first_name": null, "last_name": null, "locale": null})
        );
    }

    #[test]
    fn test_database_request_omits_missing_schedules() {
        let body = serde_json::to_value(DatabaseRequest {
            engine: "h2".to_string(),
            name: "Sample".to_string(),
            details: Details::new(),
            schedules: None,
        })
        .unwrap();
        assert!(body.get("schedules").is_none());
    }
}
