//! Read-only lookups of objects that are not under management.
//!
//! Unlike reconcilers there is no recorded state to drop, so a missing
//! object is an error here.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::mappers;
use crate::models::{DatabaseInfo, PermissionsGroupModel, UserModel};
use crate::resource::Response;
use crate::resources::{PermissionsGroupResource, UserResource};
use crate::secrets;
use crate::value::Attr;
use metabase_api::Client;

/// Look up a database. Secret details are dropped, not returned.
pub fn database(client: &Client, id: i64) -> Response<DatabaseInfo> {
    let mut diags = Diagnostics::new();
    let database = match client.get_database(id) {
        Ok(database) => database,
        Err(e) => {
            diags.add_transport_error(format!("Failed to get database with ID {id}"), &e);
            return Response::retained(diags);
        }
    };

    let details = match &database.details {
        None => Attr::Null,
        Some(details) => match mappers::encode_details(&secrets::filter_public(details)) {
            Ok(encoded) => Attr::Value(encoded),
            Err(e) => {
                diags.add_error(
                    DiagnosticKind::Serialization,
                    format!("Error parsing details for database {id}"),
                    e.to_string(),
                );
                Attr::Null
            }
        },
    };

    let info = DatabaseInfo {
        id: database.id,
        engine: database.engine.clone(),
        name: database.name.clone(),
        features: database.features.clone(),
        details,
        schedules: mappers::build_schedules(&database),
    };
    Response::set(info, diags)
}

/// Look up a user by ID.
pub fn user(client: &Client, id: i64) -> Response<UserModel> {
    let mut diags = Diagnostics::new();
    match client.get_user(id) {
        Ok(user) => Response::set(UserResource::to_model(&user, None), diags),
        Err(e) => {
            diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
            Response::retained(diags)
        }
    }
}

/// Look up the user the client is authenticated as.
pub fn current_user(client: &Client) -> Response<UserModel> {
    let mut diags = Diagnostics::new();
    match client.get_current_user() {
        Ok(user) => Response::set(UserResource::to_model(&user, None), diags),
        Err(e) => {
            diags.add_transport_error("Failed to get current user", &e);
            Response::retained(diags)
        }
    }
}

/// Look up a permissions group by ID.
pub fn permissions_group(client: &Client, id: i64) -> Response<PermissionsGroupModel> {
    let mut diags = Diagnostics::new();
    match client.get_permissions_group(id) {
        Ok(group) => Response::set(PermissionsGroupResource::to_model(&group), diags),
        Err(e) => {
            diags.add_transport_error(format!("Failed to get permissions group with ID {id}"), &e);
            Response::retained(diags)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metabase_api::{Database, MOCK_REDACTED, MockBackend, Schedules, User};
    use serde_json::json;

    fn setup() -> (MockBackend, Client) {
        let mock = MockBackend::with_reserved_groups();
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client)
    }

    fn user_record(id: i64) -> User {
        serde_json::from_value(json!({
            "id": id,
            "email": "grace@example.com",
            "first_name": "Grace",
            "is_active": true,
            "is_superuser": true,
            "user_group_memberships": [{"id": 1}, {"id": 2}, {"id": 9}],
        }))
        .unwrap()
    }

    #[test]
    fn test_database_drops_secrets() {
        let (mock, client) = setup();
        mock.add_database(Database {
            id: 1,
            name: "Sample".into(),
            engine: "h2".into(),
            features: vec!["basic-aggregations".into()],
            details: json!({"db": "file:sample", "password": MOCK_REDACTED})
                .as_object()
                .cloned(),
            schedules: Some(Schedules::new()),
            is_sample: true,
            created_at: None,
            updated_at: None,
        });

        let info = database(&client, 1).model().cloned().unwrap();
        assert_eq!(info.details, Attr::Value(r#"{"db":"file:sample"}"#.to_string()));
        assert_eq!(info.schedules.len(), 2);
    }

    #[test]
    fn test_missing_database_is_error() {
        let (_, client) = setup();
        assert!(database(&client, 404).has_error());
    }

    #[test]
    fn test_user_strips_reserved_groups() {
        let (mock, client) = setup();
        mock.add_user(user_record(5));
        let model = user(&client, 5).model().cloned().unwrap();
        assert_eq!(model.group_ids, Attr::Value(vec![9]));
        assert_eq!(model.is_superuser, Attr::Value(true));
        assert_eq!(model.last_name, Attr::Null);
    }

    #[test]
    fn test_current_user() {
        let (mock, client) = setup();
        assert!(current_user(&client).has_error());

        mock.add_user(user_record(5));
        mock.set_current_user(5);
        assert_eq!(current_user(&client).model().unwrap().email, "grace@example.com");
    }

    #[test]
    fn test_permissions_group() {
        let (_, client) = setup();
        assert_eq!(permissions_group(&client, 1).model().unwrap().name, "All Users");
        assert!(permissions_group(&client, 77).has_error());
    }
}
