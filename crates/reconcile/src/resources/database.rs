//! Database connections.

use crate::diagnostics::Diagnostics;
use crate::mappers;
use crate::models::DatabaseModel;
use crate::plan;
use crate::resource::{Resource, Response, missing_id, parse_import_id};
use crate::secrets;
use crate::transforms;
use crate::validation;
use crate::value::Attr;
use log::{debug, info, warn};
use metabase_api::{Client, Database, DatabaseRequest, Details};

/// Reconciler for `database` resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseResource;

impl DatabaseResource {
    /// Map a remote database to state, with no plan or prior values applied.
    pub fn to_model(database: &Database) -> (DatabaseModel, Diagnostics) {
        let (details, details_secure, diags) = mappers::build_database_details(database);
        let model = DatabaseModel {
            id: Attr::Value(database.id),
            engine: database.engine.clone(),
            name: database.name.clone(),
            features: transforms::to_string_list(Some(database.features.clone())),
            details,
            details_secure,
            schedules: Attr::Value(mappers::build_schedules(database)),
        };
        (model, diags)
    }

    fn request(plan: &DatabaseModel, details: Details) -> DatabaseRequest {
        DatabaseRequest {
            engine: plan.engine.clone(),
            name: plan.name.clone(),
            details,
            schedules: None,
        }
    }

    /// Fetch after a write and let declared details win over the echo.
    fn fetch_consistent(
        client: &Client,
        id: i64,
        plan: &DatabaseModel,
        mut diags: Diagnostics,
    ) -> Response<DatabaseModel> {
        match client.get_database(id) {
            Ok(database) => {
                let (mut model, mapped) = Self::to_model(&database);
                diags.extend(mapped);
                model.details = model.details.prefer_known(&plan.details);
                model.details_secure = model.details_secure.prefer_known(&plan.details_secure);
                Response::set(model, diags)
            }
            Err(e) => {
                diags.add_transport_error(format!("Error fetching database with ID: {id}"), &e);
                Response::retained(diags)
            }
        }
    }
}

/// Decide which `details` string to record after a read.
///
/// The prior value stands while every public key it declares still matches
/// remotely; otherwise the remote public half replaces it so the drift
/// shows up in the next plan. Secrets declared in `details` are only ever
/// returned redacted in the secure half, so they are not compared.
fn reconcile_details(prior: &Attr<String>, remote: Attr<String>) -> Attr<String> {
    let decode = |attr: &Attr<String>| mappers::parse_details(attr, "details").ok().flatten();
    match prior {
        Attr::Absent => remote,
        Attr::Null => match decode(&remote) {
            Some(public) if !public.is_empty() => remote,
            _ => Attr::Null,
        },
        Attr::Value(_) => match (decode(prior), decode(&remote)) {
            (Some(declared), Some(public))
                if mappers::details_match(&secrets::filter_public(&declared), &public) =>
            {
                prior.clone()
            }
            _ => remote,
        },
    }
}

impl Resource for DatabaseResource {
    type Model = DatabaseModel;

    const TYPE_NAME: &'static str = "database";

    fn plan(&self, declared: &DatabaseModel, prior: Option<&DatabaseModel>) -> DatabaseModel {
        plan::plan_database(declared, prior)
    }

    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &["details_secure"]
    }

    fn validate(&self, plan: &DatabaseModel) -> Diagnostics {
        validation::validate_database(plan).1
    }

    fn create(&self, client: &Client, plan: &DatabaseModel) -> Response<DatabaseModel> {
        let (details, mut diags) = validation::validate_database(plan);
        let Some(details) = details else {
            return Response::retained(diags);
        };

        let id = match client.create_database(&Self::request(plan, details)) {
            Ok(id) => id,
            Err(e) => {
                diags.add_transport_error("Error creating database", &e);
                return Response::retained(diags);
            }
        };
        info!("Created database '{}' with ID {id}", plan.name);
        Self::fetch_consistent(client, id, plan, diags)
    }

    fn read(&self, client: &Client, prior: &DatabaseModel) -> Response<DatabaseModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        debug!("Reading database {id}");

        let mut diags = Diagnostics::new();
        match client.get_database(id) {
            Ok(database) => {
                let (mut model, mapped) = Self::to_model(&database);
                diags.extend(mapped);
                model.details = reconcile_details(&prior.details, model.details);
                model.details_secure = model.details_secure.prefer_known(&prior.details_secure);
                Response::set(model, diags)
            }
            Err(e) if e.is_not_found() => {
                warn!("Database {id} no longer exists, removing it from state");
                Response::removed(diags)
            }
            Err(e) => {
                diags.add_transport_error(format!("Error fetching database with ID: {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn update(
        &self,
        client: &Client,
        plan: &DatabaseModel,
        prior: &DatabaseModel,
    ) -> Response<DatabaseModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let (details, mut diags) = validation::validate_database(plan);
        let Some(details) = details else {
            return Response::retained(diags);
        };

        if let Err(e) = client.update_database(id, &Self::request(plan, details)) {
            diags.add_transport_error(format!("Error updating database with ID {id}"), &e);
            return Response::retained(diags);
        }
        info!("Updated database {id}");
        Self::fetch_consistent(client, id, plan, diags)
    }

    fn delete(&self, client: &Client, prior: &DatabaseModel) -> Response<DatabaseModel> {
        let Some(id) = self.id(prior) else {
            return Response::error(missing_id(Self::TYPE_NAME));
        };
        let mut diags = Diagnostics::new();
        match client.delete_database(id) {
            Ok(()) => {
                info!("Deleted database {id}");
                Response::removed(diags)
            }
            Err(e) => {
                diags.add_transport_error(format!("Error deleting database: {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn import(&self, client: &Client, id: &str) -> Response<DatabaseModel> {
        let id = match parse_import_id(Self::TYPE_NAME, id) {
            Ok(id) => id,
            Err(d) => return Response::error(d),
        };
        let mut diags = Diagnostics::new();
        match client.get_database(id) {
            Ok(database) => {
                let (model, mapped) = Self::to_model(&database);
                diags.extend(mapped);
                Response::set(model, diags)
            }
            Err(e) => {
                diags.add_transport_error(format!("Failed to get database with ID {id}"), &e);
                Response::retained(diags)
            }
        }
    }

    fn id(&self, model: &DatabaseModel) -> Option<i64> {
        model.id.value().copied()
    }

    fn requires_replace(&self, prior: &DatabaseModel, plan: &DatabaseModel) -> bool {
        prior.engine != plan.engine
    }
}
