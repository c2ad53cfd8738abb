//! Permissions groups.

use crate::diagnostics::Diagnostics;
use crate::models::PermissionsGroupModel;
use crate::plan;
use crate::resource::{Resource, Response, missing_id, parse_import_id};
use crate::validation;
use crate::value::Attr;
use log::{debug, info, warn};
use metabase_api::{Client, PermissionsGroup, PermissionsGroupRequest};

/// Reconciler for `permissions_group` resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionsGroupResource;

impl PermissionsGroupResource {
    /// Map a remote group to state.
    pub fn to_model(group: &PermissionsGroup) -> PermissionsGroupModel {
        PermissionsGroupModel {
            id: Attr::Value(group.id),
            name: group.name.clone(),
        }
    }

    fn fetch_consistent(
        client: &Client,
        id: i64,
        plan: &PermissionsGroupModel,
        mut diags: Diagnostics,
    ) -> Response<PermissionsGroupModel> {
        match client.get_permissions_group(id) {
            Ok(group) => {
                let mut model = Self::to_model(&group);
                model.name.clone_from(&plan.name);
                Response::set(model, diags)
            }
            Err(e) => {
                diags.add_transport_error(
                    format!("Failed to get permissions group with ID {id}"),
                    &e,
                );
                Response::retained(diags)
            }
        }
    }
}

impl Resource for PermissionsGroupResource {
    type Model = PermissionsGroupModel;

    const TYPE_NAME: &'static str = "permissions_group";

    fn plan(
        &self,
        declared: &PermissionsGroupModel,
        prior: Option<&PermissionsGroupModel>,
    ) -> PermissionsGroupModel {
        plan::plan_permissions_group(declared, prior)
    }

    fn validate(&self, plan: &PermissionsGroupModel) -> Diagnostics {
        validation::validate_permissions_group(plan)
    }

    fn create(
        &self,
        client: &Client,
        plan: &PermissionsGroupModel,
    ) -> Response<PermissionsGroupModel> {
        let mut diags = validation::validate_permissions_group(plan);
        if diags.has_error() {
            return Response::retained(diags);
        }
        let request = PermissionsGroupRequest {
            name: plan.name.clone(),
        };
        let id = match client.create_permissions_group(&request) {
            Ok(id) => id,
            Err(e) => {
                diags.add_transport_error("Error creating permissions group", &e);
                return Response::retained(diags);
            }
        };
        info!("Created permissions group '{}' with ID {id}", plan.name);
        Self::fetch_consistent(client, id, plan, diags)
    }

    fn read(
        &self,
        client: &Client,
        prior: &PermissionsGroupModel,
    ) -> Response<PermissionsGroupModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        debug!("Reading permissions group {id}");
        let mut diags = Diagnostics::new();
        match client.get_permissions_group(id) {
            Ok(group) => Response::set(Self::to_model(&group), diags),
            Err(e) if e.is_not_found() => {
                warn!("Permissions group {id} no longer exists, removing it from state");
                Response::removed(diags)
            }
            Err(e) => {
                diags.add_transport_error(
                    format!("Failed to get permissions group with ID {id}"),
                    &e,
                );
                Response::retained(diags)
            }
        }
    }

    fn update(
        &self,
        client: &Client,
        plan: &PermissionsGroupModel,
        prior: &PermissionsGroupModel,
    ) -> Response<PermissionsGroupModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let mut diags = validation::validate_permissions_group(plan);
        if diags.has_error() {
            return Response::retained(diags);
        }
        let request = PermissionsGroupRequest {
            name: plan.name.clone(),
        };
        if let Err(e) = client.update_permissions_group(id, &request) {
            diags.add_transport_error(
                format!("Error updating permissions group with ID {id}"),
                &e,
            );
            return Response::retained(diags);
        }
        info!("Renamed permissions group {id} to '{}'", plan.name);
        Self::fetch_consistent(client, id, plan, diags)
    }

    fn delete(
        &self,
        client: &Client,
        prior: &PermissionsGroupModel,
    ) -> Response<PermissionsGroupModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let mut diags = Diagnostics::new();
        match client.delete_permissions_group(id) {
            Ok(()) => {
                info!("Deleted permissions group {id}");
                Response::removed(diags)
            }
            Err(e) if e.is_not_found() => {
                debug!("Permissions group {id} was already gone");
                Response::removed(diags)
            }
            Err(e) => {
                diags.add_transport_error(
                    format!("Error deleting permissions group with ID {id}"),
                    &e,
                );
                Response::retained(diags)
            }
        }
    }

    fn import(&self, client: &Client, id: &str) -> Response<PermissionsGroupModel> {
        let id = match parse_import_id(Self::TYPE_NAME, id) {
            Ok(id) => id,
            Err(d) => return Response::error(d),
        };
        let mut diags = Diagnostics::new();
        match client.get_permissions_group(id) {
            Ok(group) => Response::set(Self::to_model(&group), diags),
            Err(e) => {
                diags.add_transport_error(
                    format!("Failed to get permissions group with ID {id}"),
                    &e,
                );
                Response::retained(diags)
            }
        }
    }

    fn id(&self, model: &PermissionsGroupModel) -> Option<i64> {
        model.id.value().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NewState;
    use metabase_api::MockBackend;

    fn setup() -> (MockBackend, Client) {
        let mock = MockBackend::with_reserved_groups();
        let client = Client::with_backend(Box::new(mock.clone()));
        (mock, client)
    }

    fn created(client: &Client, name: &str) -> PermissionsGroupModel {
        let response = PermissionsGroupResource.create(client, &PermissionsGroupModel::new(name));
        assert!(!response.has_error(), "{:?}", response.diagnostics);
        response.model().cloned().unwrap()
    }

    #[test]
    fn test_create_and_read() {
        let (_, client) = setup();
        let model = created(&client, "Analysts");
        assert_eq!(model.name, "Analysts");
        assert!(model.id.is_known());

        let read = PermissionsGroupResource.read(&client, &model);
        assert_eq!(read.model(), Some(&model));
    }

    #[test]
    fn test_create_empty_name_is_rejected() {
        let (mock, client) = setup();
        let response = PermissionsGroupResource.create(&client, &PermissionsGroupModel::new(""));
        assert!(response.has_error());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_create_duplicate_name_is_transport_error() {
        let (_, client) = setup();
        created(&client, "Analysts");
        let response =
            PermissionsGroupResource.create(&client, &PermissionsGroupModel::new("Analysts"));
        assert!(response.has_error());
        assert_eq!(response.state, NewState::Retained);
    }

    #[test]
    fn test_rename() {
        let (mock, client) = setup();
        let prior = created(&client, "Analysts");
        let id = prior.id.value().copied().unwrap();

        let mut plan = PermissionsGroupModel::new("Data Team");
        plan.id = prior.id.clone();
        let response = PermissionsGroupResource.update(&client, &plan, &prior);
        assert_eq!(response.model().unwrap().name, "Data Team");
        assert_eq!(mock.group(id).unwrap().name, "Data Team");
    }

    #[test]
    fn test_read_missing_is_removed() {
        let (_, client) = setup();
        let mut ghost = PermissionsGroupModel::new("Ghost");
        ghost.id = Attr::Value(999);
        let response = PermissionsGroupResource.read(&client, &ghost);
        assert_eq!(response.state, NewState::Removed);
    }

    #[test]
    fn test_delete_missing_group_succeeds() {
        let (_, client) = setup();
        let mut ghost = PermissionsGroupModel::new("Ghost");
        ghost.id = Attr::Value(999);
        let response = PermissionsGroupResource.delete(&client, &ghost);
        assert_eq!(response.state, NewState::Removed);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_delete_other_failure_is_error() {
        let (mock, client) = setup();
        let prior = created(&client, "Analysts");
        mock.fail_operation("delete_permissions_group", 500);
        let response = PermissionsGroupResource.delete(&client, &prior);
        assert_eq!(response.state, NewState::Retained);
        assert!(response.has_error());
    }

    #[test]
    fn test_import() {
        let (_, client) = setup();
        let response = PermissionsGroupResource.import(&client, "2");
        assert_eq!(response.model().unwrap().name, "Administrators");
    }
}
