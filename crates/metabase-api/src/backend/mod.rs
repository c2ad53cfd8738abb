//! Backend trait and implementations for talking to Metabase.
//!
//! This module provides the [`Backend`] trait, the blocking
//! [`http::HttpBackend`] used against a real instance, and an in-memory
//! [`MockBackend`] for tests.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use metabase_api::backend::{Backend, MockBackend};
//! use metabase_api::PermissionsGroupRequest;
//!
//! let mock = MockBackend::with_reserved_groups();
//! let id = mock
//!     .create_permissions_group(&PermissionsGroupRequest { name: "Analysts".into() })
//!     .unwrap();
//!
//! assert_eq!(mock.get_permissions_group(id).unwrap().name, "Analysts");
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    Database, DatabaseRequest, Details, GROUP_ADMINISTRATORS, GROUP_ALL_USERS, GroupMembership,
    PermissionsGroup, PermissionsGroupRequest, Schedules, User, UserCreateRequest,
    UserUpdateRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Operations the reconciliation layer needs from Metabase.
///
/// Every method is a single blocking round trip. `Get`-style methods must
/// report a missing object as [`Error::NotFound`] so callers can tell
/// removal apart from failure.
pub trait Backend: Send + Sync {
    /// Fetch a database by ID.
    fn get_database(&self, id: i64) -> Result<Database>;

    /// Create a database, returning its ID.
    fn create_database(&self, request: &DatabaseRequest) -> Result<i64>;

    /// Replace a database's configuration.
    fn update_database(&self, id: i64, request: &DatabaseRequest) -> Result<()>;

    /// Permanently delete a database.
    fn delete_database(&self, id: i64) -> Result<()>;

    /// Fetch an active user by ID. Deactivated users are reported as not found.
    fn get_user(&self, id: i64) -> Result<User>;

    /// Fetch the user the client is authenticated as.
    fn get_current_user(&self) -> Result<User>;

    /// Create a user, returning its ID.
    fn create_user(&self, request: &UserCreateRequest) -> Result<i64>;

    /// Replace a user's attributes and memberships.
    fn update_user(&self, id: i64, request: &UserUpdateRequest) -> Result<()>;

    /// Reactivate a deactivated user. Succeeds if the user is already active.
    fn reactivate_user(&self, id: i64) -> Result<()>;

    /// Deactivate (soft-delete) a user.
    fn disable_user(&self, id: i64) -> Result<()>;

    /// Fetch a permissions group by ID.
    fn get_permissions_group(&self, id: i64) -> Result<PermissionsGroup>;

    /// Create a permissions group, returning its ID.
    fn create_permissions_group(&self, request: &PermissionsGroupRequest) -> Result<i64>;

    /// Rename a permissions group.
    fn update_permissions_group(&self, id: i64, request: &PermissionsGroupRequest) -> Result<()>;

    /// Permanently delete a permissions group.
    fn delete_permissions_group(&self, id: i64) -> Result<()>;
}

// ============================================================================
// Mock Backend
// ============================================================================

/// IDs handed out by the mock start here, clear of the reserved groups.
const FIRST_MOCK_ID: i64 = 100;

/// Value the mock substitutes for secret details, mirroring Metabase.
pub const MOCK_REDACTED: &str = "**MetabasePass**";

const MOCK_SECRET_KEYS: [&str; 2] = ["password", "service-account-json"];

#[derive(Debug, Default)]
struct MockState {
    next_id: i64,
    databases: HashMap<i64, Database>,
    users: HashMap<i64, User>,
    groups: HashMap<i64, PermissionsGroup>,
    current_user: Option<i64>,
    failures: HashMap<String, u16>,
    user_updates: Vec<(i64, UserUpdateRequest)>,
    calls: Vec<String>,
}

impl MockState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.max(FIRST_MOCK_ID);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record the call and return an injected failure if one is armed.
    fn enter(&mut self, operation: &str, kind: &str, id: impl ToString) -> Result<()> {
        let id = id.to_string();
        self.calls.push(format!("{operation} {id}").trim_end().to_string());
        match self.failures.get(operation).copied() {
            Some(404) => Err(Error::not_found(kind, id)),
            Some(status) => Err(Error::status(status, format!("injected {operation} failure"))),
            None => Ok(()),
        }
    }

    fn active_user_mut(&mut self, id: i64) -> Result<&mut User> {
        match self.users.get_mut(&id) {
            Some(user) if user.is_active => Ok(user),
            _ => Err(Error::not_found("user", id)),
        }
    }
}

/// In-memory Metabase for testing without network access.
///
/// Clones share the same state, so a test can keep a handle after boxing
/// one into a [`crate::Client`]. Like Metabase, the mock redacts secret
/// connection details, hides deactivated users from `get_user`, and keeps
/// the reserved group memberships in sync with the superuser flag.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend containing the two reserved groups.
    #[must_use]
    pub fn with_reserved_groups() -> Self {
        let mock = Self::new();
        mock.add_group(PermissionsGroup {
            id: GROUP_ALL_USERS,
            name: "All Users".to_string(),
            member_count: None,
        });
        mock.add_group(PermissionsGroup {
            id: GROUP_ADMINISTRATORS,
            name: "Administrators".to_string(),
            member_count: None,
        });
        mock
    }

    /// Insert a database as-is.
    pub fn add_database(&self, database: Database) {
        let mut state = self.state.lock().unwrap();
        state.databases.insert(database.id, database);
    }

    /// Insert a user as-is.
    pub fn add_user(&self, user: User) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(user.id, user);
    }

    /// Insert a permissions group as-is.
    pub fn add_group(&self, group: PermissionsGroup) {
        let mut state = self.state.lock().unwrap();
        state.groups.insert(group.id, group);
    }

    /// Make `get_current_user` return the user with this ID.
    pub fn set_current_user(&self, id: i64) {
        self.state.lock().unwrap().current_user = Some(id);
    }

    /// Deactivate a user behind the client's back.
    pub fn deactivate_user(&self, id: i64) {
        if let Some(user) = self.state.lock().unwrap().users.get_mut(&id) {
            user.is_active = false;
        }
    }

    /// Remove a user entirely, as if it never existed.
    pub fn purge_user(&self, id: i64) {
        self.state.lock().unwrap().users.remove(&id);
    }

    /// Remove a database behind the client's back.
    pub fn purge_database(&self, id: i64) {
        self.state.lock().unwrap().databases.remove(&id);
    }

    /// Make every call to `operation` fail with `status` (404 means not found).
    pub fn fail_operation(&self, operation: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert(operation.to_string(), status);
    }

    /// Disarm a failure set with [`MockBackend::fail_operation`].
    pub fn clear_failure(&self, operation: &str) {
        self.state.lock().unwrap().failures.remove(operation);
    }

    /// Stored database, bypassing failure injection.
    #[must_use]
    pub fn database(&self, id: i64) -> Option<Database> {
        self.state.lock().unwrap().databases.get(&id).cloned()
    }

    /// Stored user (active or not), bypassing failure injection.
    #[must_use]
    pub fn user(&self, id: i64) -> Option<User> {
        self.state.lock().unwrap().users.get(&id).cloned()
    }

    /// Stored permissions group, bypassing failure injection.
    #[must_use]
    pub fn group(&self, id: i64) -> Option<PermissionsGroup> {
        self.state.lock().unwrap().groups.get(&id).cloned()
    }

    /// Every user update request received, in order.
    #[must_use]
    pub fn user_updates(&self) -> Vec<(i64, UserUpdateRequest)> {
        self.state.lock().unwrap().user_updates.clone()
    }

    /// Every call received, as `"operation id"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn redact(details: &Details) -> Details {
    details
        .iter()
        .map(|(k, v)| {
            if MOCK_SECRET_KEYS.contains(&k.as_str()) && v.is_string() {
                (k.clone(), serde_json::Value::String(MOCK_REDACTED.to_string()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

fn sync_admin_membership(user: &mut User) {
    let has_admin = user
        .group_memberships
        .iter()
        .any(|m| m.id == GROUP_ADMINISTRATORS);
    if user.is_superuser && !has_admin {
        user.group_memberships
            .push(GroupMembership::new(GROUP_ADMINISTRATORS));
    } else if !user.is_superuser {
        user.group_memberships
            .retain(|m| m.id != GROUP_ADMINISTRATORS);
    }
    if !user.group_memberships.iter().any(|m| m.id == GROUP_ALL_USERS) {
        user.group_memberships
            .insert(0, GroupMembership::new(GROUP_ALL_USERS));
    }
}

fn common_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    match (first, last) {
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (Some(n), None) | (None, Some(n)) => Some(n.to_string()),
        (None, None) => None,
    }
}

impl Backend for MockBackend {
    fn get_database(&self, id: i64) -> Result<Database> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_database", "database", id)?;
        state
            .databases
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("database", id))
    }

    fn create_database(&self, request: &DatabaseRequest) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_database", "database", "")?;
        let id = state.allocate_id();
        state.databases.insert(
            id,
            Database {
                id,
                name: request.name.clone(),
                engine: request.engine.clone(),
                features: vec!["basic-aggregations".to_string(), "nested-queries".to_string()],
                details: Some(redact(&request.details)),
                schedules: Some(request.schedules.clone().unwrap_or_else(Schedules::new)),
                is_sample: false,
                created_at: Some("2024-01-15T00:00:00Z".to_string()),
                updated_at: None,
            },
        );
        Ok(id)
    }

    fn update_database(&self, id: i64, request: &DatabaseRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("update_database", "database", id)?;
        let database = state
            .databases
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("database", id))?;
        database.name.clone_from(&request.name);
        database.engine.clone_from(&request.engine);
        database.details = Some(redact(&request.details));
        if let Some(schedules) = &request.schedules {
            database.schedules = Some(schedules.clone());
        }
        database.updated_at = Some("2024-01-16T00:00:00Z".to_string());
        Ok(())
    }

    fn delete_database(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_database", "database", id)?;
        state
            .databases
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("database", id))
    }

    fn get_user(&self, id: i64) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_user", "user", id)?;
        state.active_user_mut(id).cloned()
    }

    fn get_current_user(&self) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_current_user", "user", "current")?;
        let id = state
            .current_user
            .ok_or_else(|| Error::Unauthorized("no current session".to_string()))?;
        state.active_user_mut(id).cloned()
    }

    fn create_user(&self, request: &UserCreateRequest) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_user", "user", "")?;
        if state
            .users
            .values()
            .any(|u| u.is_active && u.email == request.email)
        {
            return Err(Error::status(400, "Email address already in use."));
        }
        let id = state.allocate_id();
        let mut user = User {
            id,
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            common_name: common_name(
                request.first_name.as_deref(),
                request.last_name.as_deref(),
            ),
            locale: None,
            group_memberships: request.user_group_memberships.clone().unwrap_or_default(),
            legacy_group_ids: Vec::new(),
            google_auth: false,
            ldap_auth: false,
            is_active: true,
            is_installer: Some(false),
            is_qbnewb: true,
            is_superuser: false,
            has_invited_second_user: false,
            has_question_and_dashboard: false,
            date_joined: Some("2024-01-15T00:00:00Z".to_string()),
            first_login: None,
            last_login: None,
            updated_at: None,
        };
        sync_admin_membership(&mut user);
        state.users.insert(id, user);
        Ok(id)
    }

    fn update_user(&self, id: i64, request: &UserUpdateRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("update_user", "user", id)?;
        state.user_updates.push((id, request.clone()));
        let user = state.active_user_mut(id)?;
        if let Some(email) = &request.email {
            user.email.clone_from(email);
        }
        user.first_name.clone_from(&request.first_name);
        user.last_name.clone_from(&request.last_name);
        user.locale.clone_from(&request.locale);
        if let Some(memberships) = &request.user_group_memberships {
            user.group_memberships.clone_from(memberships);
        }
        if let Some(is_superuser) = request.is_superuser {
            user.is_superuser = is_superuser;
        }
        user.common_name = common_name(user.first_name.as_deref(), user.last_name.as_deref());
        user.updated_at = Some("2024-01-16T00:00:00Z".to_string());
        sync_admin_membership(user);
        Ok(())
    }

    fn reactivate_user(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("reactivate_user", "user", id)?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("user", id))?;
        user.is_active = true;
        Ok(())
    }

    fn disable_user(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("disable_user", "user", id)?;
        state.active_user_mut(id)?.is_active = false;
        Ok(())
    }

    fn get_permissions_group(&self, id: i64) -> Result<PermissionsGroup> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_permissions_group", "permissions group", id)?;
        state
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("permissions group", id))
    }

    fn create_permissions_group(&self, request: &PermissionsGroupRequest) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_permissions_group", "permissions group", "")?;
        if state.groups.values().any(|g| g.name == request.name) {
            return Err(Error::status(400, "A group with that name already exists."));
        }
        let id = state.allocate_id();
        state.groups.insert(
            id,
            PermissionsGroup {
                id,
                name: request.name.clone(),
                member_count: Some(0),
            },
        );
        Ok(id)
    }

    fn update_permissions_group(&self, id: i64, request: &PermissionsGroupRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("update_permissions_group", "permissions group", id)?;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("permissions group", id))?;
        group.name.clone_from(&request.name);
        Ok(())
    }

    fn delete_permissions_group(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_permissions_group", "permissions group", id)?;
        state
            .groups
            .remove(&id)
            .ok_or_else(|| Error::not_found("permissions group", id))?;
        for user in state.users.values_mut() {
            user.group_memberships.retain(|m| m.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(value: serde_json::Value) -> Details {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mock_backend_new_is_empty() {
        let mock = MockBackend::new();
        assert!(mock.get_database(1).unwrap_err().is_not_found());
        assert!(mock.get_user(1).unwrap_err().is_not_found());
        assert!(mock.get_permissions_group(1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mock_backend_redacts_passwords() {
        let mock = MockBackend::new();
        let id = mock
            .create_database(&DatabaseRequest {
                engine: "postgres".into(),
                name: "Warehouse".into(),
                details: details(json!({"host": "pg", "password": "secret"})),
                schedules: None,
            })
            .unwrap();

        let db = mock.get_database(id).unwrap();
        let stored = db.details.unwrap();
        assert_eq!(stored["host"], json!("pg"));
        assert_eq!(stored["password"], json!(MOCK_REDACTED));
        assert_eq!(db.schedules, Some(Schedules::new()));
    }

    #[test]
    fn test_mock_backend_ids_avoid_reserved_groups() {
        let mock = MockBackend::with_reserved_groups();
        let id = mock
            .create_permissions_group(&PermissionsGroupRequest { name: "Analysts".into() })
            .unwrap();
        assert!(id >= FIRST_MOCK_ID);
    }

    #[test]
    fn test_mock_backend_deactivated_user_is_not_found() {
        let mock = MockBackend::new();
        let id = mock
            .create_user(&UserCreateRequest {
                email: "a@example.com".into(),
                first_name: None,
                last_name: None,
                user_group_memberships: None,
            })
            .unwrap();

        mock.disable_user(id).unwrap();
        assert!(mock.get_user(id).unwrap_err().is_not_found());

        mock.reactivate_user(id).unwrap();
        assert!(mock.get_user(id).unwrap().is_active);
    }

    #[test]
    fn test_mock_backend_reactivate_active_user_is_noop() {
        let mock = MockBackend::new();
        let id = mock
            .create_user(&UserCreateRequest {
                email: "a@example.com".into(),
                first_name: None,
                last_name: None,
                user_group_memberships: None,
            })
            .unwrap();
        mock.reactivate_user(id).unwrap();
        assert!(mock.get_user(id).is_ok());
    }

    #[test]
    fn test_mock_backend_superuser_joins_administrators() {
        let mock = MockBackend::new();
        let id = mock
            .create_user(&UserCreateRequest {
                email: "a@example.com".into(),
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                user_group_memberships: None,
            })
            .unwrap();
        assert_eq!(mock.get_user(id).unwrap().group_ids(), vec![GROUP_ALL_USERS]);

        mock.update_user(
            id,
            &UserUpdateRequest {
                first_name: Some("Ada".into()),
                is_superuser: Some(true),
                ..UserUpdateRequest::default()
            },
        )
        .unwrap();

        let user = mock.get_user(id).unwrap();
        assert_eq!(user.group_ids(), vec![GROUP_ALL_USERS, GROUP_ADMINISTRATORS]);
        assert!(user.last_name.is_none());
        assert_eq!(user.common_name.as_deref(), Some("Ada"));
        assert_eq!(mock.user_updates().len(), 1);
    }

    #[test]
    fn test_mock_backend_failure_injection() {
        let mock = MockBackend::with_reserved_groups();
        mock.fail_operation("get_permissions_group", 500);
        let err = mock.get_permissions_group(GROUP_ALL_USERS).unwrap_err();
        assert!(!err.is_not_found());

        mock.fail_operation("get_permissions_group", 404);
        assert!(mock.get_permissions_group(GROUP_ALL_USERS).unwrap_err().is_not_found());

        mock.clear_failure("get_permissions_group");
        assert!(mock.get_permissions_group(GROUP_ALL_USERS).is_ok());
    }

    #[test]
    fn test_mock_backend_records_calls() {
        let mock = MockBackend::new();
        let _ = mock.get_database(5);
        let _ = mock.delete_permissions_group(9);
        assert_eq!(
            mock.calls(),
            vec!["get_database 5".to_string(), "delete_permissions_group 9".to_string()]
        );
    }

    #[test]
    fn test_mock_backend_clones_share_state() {
        let mock = MockBackend::new();
        let handle = mock.clone();
        let id = mock
            .create_permissions_group(&PermissionsGroupRequest { name: "Ops".into() })
            .unwrap();
        assert_eq!(handle.group(id).unwrap().name, "Ops");
    }
}
