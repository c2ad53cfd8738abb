//! Planning: schema defaults and change detection.
//!
//! Declared configuration is first normalized into a plan (defaults filled,
//! the recorded ID carried over), then compared field by field against
//! recorded state to decide what each resource needs.

use crate::models::{DatabaseModel, PermissionsGroupModel, UserModel};
use crate::resource::Resource;
use crate::value::Attr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fill defaults for a declared database.
///
/// Optional details become null when left out; computed attributes stay
/// absent so they read as "known after apply".
pub fn plan_database(declared: &DatabaseModel, prior: Option<&DatabaseModel>) -> DatabaseModel {
    let mut plan = declared.clone();
    plan.details = plan.details.or(Attr::Null);
    plan.details_secure = plan.details_secure.or(Attr::Null);
    plan.id = prior.map_or(Attr::Absent, |p| p.id.clone());
    plan.features = Attr::Absent;
    plan.schedules = Attr::Absent;
    plan
}

/// Fill defaults for a declared user.
///
/// Group IDs default to none and the superuser flag to false, so leaving
/// them out revokes rather than ignores.
pub fn plan_user(declared: &UserModel, prior: Option<&UserModel>) -> UserModel {
    let mut plan = declared.clone();
    plan.clear_computed();
    plan.first_name = plan.first_name.or(Attr::Null);
    plan.last_name = plan.last_name.or(Attr::Null);
    plan.locale = plan.locale.or(Attr::Null);
    plan.group_ids = plan.group_ids.or(Attr::Value(Vec::new()));
    plan.is_superuser = plan.is_superuser.or(Attr::Value(false));
    plan.id = prior.map_or(Attr::Absent, |p| p.id.clone());
    plan
}

/// Fill defaults for a declared permissions group.
pub fn plan_permissions_group(
    declared: &PermissionsGroupModel,
    prior: Option<&PermissionsGroupModel>,
) -> PermissionsGroupModel {
    let mut plan = declared.clone();
    plan.id = prior.map_or(Attr::Absent, |p| p.id.clone());
    plan
}

/// What a resource needs to reach its declared configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Declared but not recorded
    Create,
    /// Recorded and declared, with differences
    Update,
    /// Recorded, but a change can only be made by recreating
    Replace,
    /// Recorded but no longer declared
    Delete,
    /// Already matches
    NoOp,
}

impl Action {
    /// Symbol used in plan output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
            Self::NoOp => " ",
        }
    }

    /// Whether the action changes anything.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        };
        write!(f, "{s}")
    }
}

/// One attribute that differs between recorded state and the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Attribute name
    pub name: String,
    /// Recorded value (`None` when not recorded)
    pub before: Option<Value>,
    /// Planned value (`None` when known only after apply)
    pub after: Option<Value>,
    /// Values must not be displayed
    pub sensitive: bool,
}

/// The outcome of planning one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Planned<M> {
    /// What to do
    pub action: Action,
    /// Normalized plan, absent for a delete
    pub plan: Option<M>,
    /// Attribute-level differences
    pub changes: Vec<FieldChange>,
}

/// Plan one resource from its declared configuration and recorded state.
pub fn plan_resource<R: Resource>(
    resource: &R,
    declared: Option<&R::Model>,
    prior: Option<&R::Model>,
) -> Planned<R::Model> {
    let plan = declared.map(|d| resource.plan(d, prior));
    let sensitive = resource.sensitive_attributes();
    let changes = diff_models(prior, plan.as_ref(), sensitive);

    let action = match (&plan, prior) {
        (None, None) => Action::NoOp,
        (Some(_), None) => Action::Create,
        (None, Some(_)) => Action::Delete,
        (Some(p), Some(prior)) if resource.requires_replace(prior, p) => Action::Replace,
        (Some(_), Some(_)) if changes.is_empty() => Action::NoOp,
        (Some(_), Some(_)) => Action::Update,
    };
    Planned {
        action,
        plan,
        changes,
    }
}

/// Compare the declared attributes of `plan` with `prior`.
///
/// Attributes absent from the plan are computed and never count as a
/// change, except when creating, where they show as known after apply.
pub fn diff_models<M: Serialize>(
    prior: Option<&M>,
    plan: Option<&M>,
    sensitive: &[&str],
) -> Vec<FieldChange> {
    let before = prior.map(to_object).unwrap_or_default();
    let after = plan.map(to_object).unwrap_or_default();
    let is_sensitive = |name: &str| sensitive.contains(&name);

    let mut changes = Vec::new();
    match (prior.is_some(), plan.is_some()) {
        (_, false) => {
            for (name, value) in before {
                changes.push(FieldChange {
                    sensitive: is_sensitive(&name),
                    name,
                    before: Some(value),
                    after: None,
                });
            }
        }
        (false, true) => {
            for (name, value) in after {
                changes.push(FieldChange {
                    sensitive: is_sensitive(&name),
                    name,
                    before: None,
                    after: Some(value),
                });
            }
        }
        (true, true) => {
            for (name, value) in after {
                if name == "id" {
                    continue;
                }
                let old = before.get(&name);
                if old.is_some_and(|old| values_equal(old, &value)) {
                    continue;
                }
                changes.push(FieldChange {
                    sensitive: is_sensitive(&name),
                    before: old.cloned(),
                    name,
                    after: Some(value),
                });
            }
        }
    }
    changes
}

fn to_object<M: Serialize>(model: &M) -> Map<String, Value> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Equality that treats JSON-object strings by content, not formatting.
fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            match (
                serde_json::from_str::<Value>(a),
                serde_json::from_str::<Value>(b),
            ) {
                (Ok(a @ Value::Object(_)), Ok(b @ Value::Object(_))) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DatabaseResource, PermissionsGroupResource, UserResource};
    use serde_json::json;

    fn recorded_user() -> UserModel {
        let mut user = plan_user(&UserModel::new("ada@example.com"), None);
        user.id = Attr::Value(100);
        user.is_active = Attr::Value(true);
        user.common_name = Attr::Value("Ada".into());
        user
    }

    #[test]
    fn test_plan_user_defaults() {
        let plan = plan_user(&UserModel::new("ada@example.com"), None);
        assert_eq!(plan.group_ids, Attr::Value(vec![]));
        assert_eq!(plan.is_superuser, Attr::Value(false));
        assert_eq!(plan.first_name, Attr::Null);
        assert!(plan.id.is_absent());
        assert!(plan.is_active.is_absent());
    }

    #[test]
    fn test_plan_user_keeps_declared_and_prior_id() {
        let mut declared = UserModel::new("ada@example.com");
        declared.group_ids = Attr::Value(vec![7]);
        declared.is_active = Attr::Value(false);
        let plan = plan_user(&declared, Some(&recorded_user()));
        assert_eq!(plan.group_ids, Attr::Value(vec![7]));
        assert_eq!(plan.id, Attr::Value(100));
        assert!(plan.is_active.is_absent());
    }

    #[test]
    fn test_plan_database_defaults() {
        let mut declared = DatabaseModel::new("h2", "Sample");
        declared.details = Attr::Value(r#"{"db":"x"}"#.into());
        declared.schedules = Attr::Value(Default::default());
        let plan = plan_database(&declared, None);
        assert_eq!(plan.details_secure, Attr::Null);
        assert!(plan.schedules.is_absent());
    }

    #[test]
    fn test_unchanged_user_is_noop() {
        let prior = recorded_user();
        let declared = UserModel::new("ada@example.com");
        let planned = plan_resource(&UserResource, Some(&declared), Some(&prior));
        assert_eq!(planned.action, Action::NoOp);
        assert!(planned.changes.is_empty());
    }

    #[test]
    fn test_changed_user_is_update() {
        let prior = recorded_user();
        let mut declared = UserModel::new("ada@example.com");
        declared.is_superuser = Attr::Value(true);
        let planned = plan_resource(&UserResource, Some(&declared), Some(&prior));
        assert_eq!(planned.action, Action::Update);
        assert_eq!(planned.changes.len(), 1);
        assert_eq!(planned.changes[0].name, "is_superuser");
        assert_eq!(planned.changes[0].before, Some(json!(false)));
    }

    #[test]
    fn test_create_and_delete() {
        let group = PermissionsGroupModel::new("Analysts");
        let create = plan_resource(&PermissionsGroupResource, Some(&group), None);
        assert_eq!(create.action, Action::Create);
        assert_eq!(create.changes.len(), 1);

        let mut recorded = group.clone();
        recorded.id = Attr::Value(5);
        let delete = plan_resource(&PermissionsGroupResource, None, Some(&recorded));
        assert_eq!(delete.action, Action::Delete);
        assert!(delete.plan.is_none());
    }

    #[test]
    fn test_engine_change_is_replace() {
        let mut prior = DatabaseModel::new("postgres", "Warehouse");
        prior.id = Attr::Value(3);
        let planned = plan_resource(
            &DatabaseResource,
            Some(&DatabaseModel::new("mysql", "Warehouse")),
            Some(&prior),
        );
        assert_eq!(planned.action, Action::Replace);
    }

    #[test]
    fn test_details_compare_by_content_and_mask_secrets() {
        let mut prior = plan_database(&DatabaseModel::new("h2", "S"), None);
        prior.id = Attr::Value(3);
        prior.details = Attr::Value(r#"{"db":"x","a":1}"#.into());
        prior.details_secure = Attr::Value(r#"{"password":"old"}"#.into());

        let mut declared = DatabaseModel::new("h2", "S");
        declared.details = Attr::Value(r#"{ "a": 1, "db": "x" }"#.into());
        declared.details_secure = Attr::Value(r#"{"password":"new"}"#.into());

        let planned = plan_resource(&DatabaseResource, Some(&declared), Some(&prior));
        assert_eq!(planned.action, Action::Update);
        assert_eq!(planned.changes.len(), 1);
        assert_eq!(planned.changes[0].name, "details_secure");
        assert!(planned.changes[0].sensitive);
    }
}
