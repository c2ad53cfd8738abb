//! Metabase users.
//!
//! Metabase cannot hard-delete users, so delete deactivates and read
//! reactivates: a user deactivated outside this tool comes back on the next
//! refresh. Reserved group memberships are stripped on the way in and
//! re-added on the way out.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::membership;
use crate::models::UserModel;
use crate::plan;
use crate::resource::{Resource, Response, missing_id, parse_import_id};
use crate::transforms;
use crate::validation;
use crate::value::Attr;
use log::{debug, info, warn};
use metabase_api::{Client, User, UserCreateRequest, UserUpdateRequest};

/// Reconciler for `user` resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

impl UserResource {
    /// Map a remote user to state.
    ///
    /// `prior_groups` keeps an already-recorded group order stable.
    pub fn to_model(user: &User, prior_groups: Option<&[i64]>) -> UserModel {
        UserModel {
            id: Attr::Value(user.id),
            email: user.email.clone(),
            first_name: transforms::to_string(user.first_name.clone()),
            last_name: transforms::to_string(user.last_name.clone()),
            common_name: transforms::to_string(user.common_name.clone()),
            locale: transforms::to_string(user.locale.clone()),
            group_ids: transforms::to_int_list(Some(membership::ordered_group_ids(
                prior_groups,
                &user.group_ids(),
            ))),
            google_auth: Attr::Value(user.google_auth),
            ldap_auth: Attr::Value(user.ldap_auth),
            is_active: Attr::Value(user.is_active),
            is_installer: transforms::to_bool(user.is_installer),
            is_qbnewb: Attr::Value(user.is_qbnewb),
            is_superuser: Attr::Value(user.is_superuser),
            has_invited_second_user: Attr::Value(user.has_invited_second_user),
            has_question_and_dashboard: Attr::Value(user.has_question_and_dashboard),
            date_joined: transforms::to_string(user.date_joined.clone()),
            first_login: transforms::to_string(user.first_login.clone()),
            last_login: transforms::to_string(user.last_login.clone()),
            updated_at: transforms::to_string(user.updated_at.clone()),
        }
    }

    fn declared_groups(plan: &UserModel) -> Vec<i64> {
        transforms::from_int_list(&plan.group_ids).unwrap_or_default()
    }

    fn declared_superuser(plan: &UserModel) -> bool {
        transforms::from_bool(&plan.is_superuser).unwrap_or(false)
    }

    fn update_request(plan: &UserModel) -> UserUpdateRequest {
        let superuser = Self::declared_superuser(plan);
        UserUpdateRequest {
            email: Some(plan.email.clone()),
            first_name: transforms::from_string(&plan.first_name),
            last_name: transforms::from_string(&plan.last_name),
            locale: transforms::from_string(&plan.locale),
            is_superuser: Some(superuser),
            user_group_memberships: Some(membership::to_memberships(&membership::add_reserved(
                &Self::declared_groups(plan),
                superuser,
            ))),
        }
    }

    fn fetch(
        client: &Client,
        id: i64,
        prior_groups: Option<&[i64]>,
    ) -> metabase_api::Result<UserModel> {
        client
            .get_user(id)
            .map(|user| Self::to_model(&user, prior_groups))
    }
}

impl Resource for UserResource {
    type Model = UserModel;

    const TYPE_NAME: &'static str = "user";

    fn plan(&self, declared: &UserModel, prior: Option<&UserModel>) -> UserModel {
        plan::plan_user(declared, prior)
    }

    fn validate(&self, plan: &UserModel) -> Diagnostics {
        validation::validate_user(plan)
    }

    fn create(&self, client: &Client, plan: &UserModel) -> Response<UserModel> {
        let mut diags = validation::validate_user(plan);
        if diags.has_error() {
            return Response::retained(diags);
        }

        let groups = Self::declared_groups(plan);
        let request = UserCreateRequest {
            email: plan.email.clone(),
            first_name: transforms::from_string(&plan.first_name),
            last_name: transforms::from_string(&plan.last_name),
            user_group_memberships: Some(membership::to_memberships(&membership::add_reserved(
                &groups, false,
            ))),
        };
        let id = match client.create_user(&request) {
            Ok(id) => id,
            Err(e) => {
                diags.add_transport_error("Error creating user", &e);
                return Response::retained(diags);
            }
        };
        info!("Created user '{}' with ID {id}", plan.email);

        // Superuser status and locale can only be set by a follow-up update.
        let superuser = Self::declared_superuser(plan);
        let mut follow_up_failed = false;
        if (superuser || plan.locale.value().is_some())
            && let Err(e) = client.update_user(id, &Self::update_request(plan))
        {
            let what = if superuser {
                "marking them as a superuser"
            } else {
                "setting their locale"
            };
            diags.add_warning(
                DiagnosticKind::PartialFailure,
                "User partially created",
                format!(
                    "User with ID {id} was created but an error occurred when {what}: {e}. \
                     Try re-applying."
                ),
            );
            follow_up_failed = true;
        }

        let mut model = match Self::fetch(client, id, Some(&groups)) {
            Ok(model) => model,
            Err(e) => {
                diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
                return Response::retained(diags);
            }
        };
        model.email.clone_from(&plan.email);
        model.first_name = model.first_name.prefer_known(&plan.first_name);
        model.last_name = model.last_name.prefer_known(&plan.last_name);
        if !follow_up_failed {
            model.group_ids = model.group_ids.prefer_known(&plan.group_ids);
            model.is_superuser = model.is_superuser.prefer_known(&plan.is_superuser);
        }
        Response::set(model, diags)
    }

    fn read(&self, client: &Client, prior: &UserModel) -> Response<UserModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        debug!("Reading user {id}");
        let prior_groups = prior.group_ids.value().map(Vec::as_slice);

        let mut diags = Diagnostics::new();
        match Self::fetch(client, id, prior_groups) {
            Ok(model) => return Response::set(model, diags),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
                return Response::retained(diags);
            }
        }

        warn!("User {id} not found, it may have been deactivated; reactivating");
        match client.reactivate_user(id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!("User {id} no longer exists, removing it from state");
                return Response::removed(diags);
            }
            Err(e) => {
                diags.add_error(
                    DiagnosticKind::Transport,
                    format!("Failed to get user with ID {id}"),
                    format!("Error occurred when reactivating user: {e}"),
                );
                return Response::retained(diags);
            }
        }

        match Self::fetch(client, id, prior_groups) {
            Ok(model) => Response::set(model, diags),
            Err(e) => {
                diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn update(&self, client: &Client, plan: &UserModel, prior: &UserModel) -> Response<UserModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let mut diags = validation::validate_user(plan);
        if diags.has_error() {
            return Response::retained(diags);
        }

        if let Err(e) = client.update_user(id, &Self::update_request(plan)) {
            diags.add_transport_error(format!("Error updating user with ID {id}"), &e);
            return Response::retained(diags);
        }
        info!("Updated user {id}");

        let groups = Self::declared_groups(plan);
        let mut model = match Self::fetch(client, id, Some(&groups)) {
            Ok(model) => model,
            Err(e) => {
                diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
                return Response::retained(diags);
            }
        };
        model.email.clone_from(&plan.email);
        model.first_name = model.first_name.prefer_known(&plan.first_name);
        model.last_name = model.last_name.prefer_known(&plan.last_name);
        model.locale = model.locale.prefer_known(&plan.locale);
        model.group_ids = model.group_ids.prefer_known(&plan.group_ids);
        model.is_superuser = model.is_superuser.prefer_known(&plan.is_superuser);
        model.is_active = model.is_active.prefer_known(&plan.is_active);
        Response::set(model, diags)
    }

    fn delete(&self, client: &Client, prior: &UserModel) -> Response<UserModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let mut diags = Diagnostics::new();
        match client.disable_user(id) {
            Ok(()) => {
                info!("Deactivated user {id}");
                Response::removed(diags)
            }
            Err(e) => {
                diags.add_transport_error(format!("Error deleting user with ID {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn import(&self, client: &Client, id: &str) -> Response<UserModel> {
        let id = match parse_import_id(Self::TYPE_NAME, id) {
            Ok(id) => id,
            Err(d) => return Response::error(d),
        };
        let mut diags = Diagnostics::new();
        if let Err(e) = client.reactivate_user(id) {
            diags.add_error(
                DiagnosticKind::Transport,
                format!("Error importing user with ID {id}"),
                format!("Error occurred when reactivating user: {e}"),
            );
            return Response::retained(diags);
        }
        match Self::fetch(client, id, None) {
            Ok(model) => Response::set(model, diags),
            Err(e) => {
                diags.add_transport_error(format!("Failed to get user with ID {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn id(&self, model: &UserModel) -> Option<i64> {
        model.id.value().copied()
    }
}
