//! Execution engine for mbprov
//!
//! The engine orchestrates:
//! 1. Planning - Compare the manifest with recorded state
//! 2. Diffing - Show what each resource needs
//! 3. Executing - Run lifecycle operations in dependency order and record
//!    their outcomes

pub mod differ;
pub mod executor;
pub mod planner;

use reconcile::{
    Address, DatabaseModel, DatabaseResource, Diagnostic, PermissionsGroupModel,
    PermissionsGroupResource, Resource, ResourceKind, UserModel, UserResource,
};
use std::collections::BTreeMap;

use crate::manifest::Manifest;
use crate::state::ProviderState;

pub use executor::{ExecuteOptions, ExecuteSummary, execute, import, refresh};
pub use planner::ExecutionPlan;

/// A diagnostic tagged with the resource it came from.
pub type Reported = (Address, Diagnostic);

/// A resource kind wired to its manifest and state tables.
pub trait Managed: Resource {
    const KIND: ResourceKind;

    fn declared(manifest: &Manifest) -> &BTreeMap<String, Self::Model>;

    fn recorded(state: &ProviderState) -> &BTreeMap<String, Self::Model>;

    fn recorded_mut(state: &mut ProviderState) -> &mut BTreeMap<String, Self::Model>;
}

impl Managed for PermissionsGroupResource {
    const KIND: ResourceKind = ResourceKind::PermissionsGroup;

    fn declared(manifest: &Manifest) -> &BTreeMap<String, PermissionsGroupModel> {
        &manifest.groups
    }

    fn recorded(state: &ProviderState) -> &BTreeMap<String, PermissionsGroupModel> {
        &state.permissions_group
    }

    fn recorded_mut(state: &mut ProviderState) -> &mut BTreeMap<String, PermissionsGroupModel> {
        &mut state.permissions_group
    }
}

impl Managed for UserResource {
    const KIND: ResourceKind = ResourceKind::User;

    fn declared(manifest: &Manifest) -> &BTreeMap<String, UserModel> {
        &manifest.users
    }

    fn recorded(state: &ProviderState) -> &BTreeMap<String, UserModel> {
        &state.user
    }

    fn recorded_mut(state: &mut ProviderState) -> &mut BTreeMap<String, UserModel> {
        &mut state.user
    }
}

impl Managed for DatabaseResource {
    const KIND: ResourceKind = ResourceKind::Database;

    fn declared(manifest: &Manifest) -> &BTreeMap<String, DatabaseModel> {
        &manifest.databases
    }

    fn recorded(state: &ProviderState) -> &BTreeMap<String, DatabaseModel> {
        &state.database
    }

    fn recorded_mut(state: &mut ProviderState) -> &mut BTreeMap<String, DatabaseModel> {
        &mut state.database
    }
}
