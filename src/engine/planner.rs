//! Execution planner

use reconcile::{
    Action, Address, DatabaseModel, DatabaseResource, FieldChange, PermissionsGroupModel,
    PermissionsGroupResource, Planned, Target, UserModel, UserResource, plan_resource,
};
use std::collections::BTreeSet;

use super::{Managed, Reported};
use crate::manifest::Manifest;
use crate::state::ProviderState;

/// The planned action for one label.
#[derive(Debug, Clone)]
pub struct Step<M> {
    pub label: String,
    pub planned: Planned<M>,
}

/// Kind-erased view of a step, for display.
#[derive(Debug, Clone, Copy)]
pub struct PlanEntry<'a> {
    pub address: &'a str,
    pub action: Action,
    pub changes: &'a [FieldChange],
}

/// Everything that would change, per kind.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub groups: Vec<Step<PermissionsGroupModel>>,
    pub users: Vec<Step<UserModel>>,
    pub databases: Vec<Step<DatabaseModel>>,
    /// Validation errors and warnings found while planning
    pub diagnostics: Vec<Reported>,
    addresses: Vec<String>,
}

impl ExecutionPlan {
    /// Plan every label declared in `manifest` or recorded in `state`.
    pub fn build(manifest: &Manifest, state: &ProviderState, target: Option<&Target>) -> Self {
        let mut diagnostics = Vec::new();
        let mut plan = Self {
            groups: plan_kind(
                &PermissionsGroupResource,
                manifest,
                state,
                target,
                &mut diagnostics,
            ),
            users: plan_kind(&UserResource, manifest, state, target, &mut diagnostics),
            databases: plan_kind(&DatabaseResource, manifest, state, target, &mut diagnostics),
            diagnostics,
            addresses: Vec::new(),
        };
        plan.addresses = plan.collect_addresses();
        plan
    }

    fn collect_addresses(&self) -> Vec<String> {
        let address = |kind, label: &str| Address::new(kind, label).to_string();
        self.groups
            .iter()
            .map(|s| address(PermissionsGroupResource::KIND, &s.label))
            .chain(self.users.iter().map(|s| address(UserResource::KIND, &s.label)))
            .chain(
                self.databases
                    .iter()
                    .map(|s| address(DatabaseResource::KIND, &s.label)),
            )
            .collect()
    }

    /// Steps in creation order, including no-ops.
    pub fn entries(&self) -> Vec<PlanEntry<'_>> {
        let planned = self
            .groups
            .iter()
            .map(|s| (s.planned.action, s.planned.changes.as_slice()))
            .chain(
                self.users
                    .iter()
                    .map(|s| (s.planned.action, s.planned.changes.as_slice())),
            )
            .chain(
                self.databases
                    .iter()
                    .map(|s| (s.planned.action, s.planned.changes.as_slice())),
            );
        self.addresses
            .iter()
            .zip(planned)
            .map(|(address, (action, changes))| PlanEntry {
                address,
                action,
                changes,
            })
            .collect()
    }

    /// Steps that change something.
    pub fn changes(&self) -> Vec<PlanEntry<'_>> {
        self.entries()
            .into_iter()
            .filter(|e| e.action.is_change())
            .collect()
    }

    /// Number of steps with the given action.
    pub fn count(&self, action: Action) -> usize {
        self.entries().iter().filter(|e| e.action == action).count()
    }

    /// Whether planning found an invalid declaration.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(_, d)| d.is_error())
    }
}

/// Plan one kind.
///
/// Labels come from both the manifest and state; a label present only in
/// state plans a delete.
fn plan_kind<R: Managed>(
    resource: &R,
    manifest: &Manifest,
    state: &ProviderState,
    target: Option<&Target>,
    diagnostics: &mut Vec<Reported>,
) -> Vec<Step<R::Model>> {
    let declared = R::declared(manifest);
    let recorded = R::recorded(state);
    let labels: BTreeSet<&String> = declared.keys().chain(recorded.keys()).collect();

    let mut steps = Vec::new();
    for label in labels {
        let address = Address::new(R::KIND, label.as_str());
        if target.is_some_and(|t| !t.matches(&address)) {
            continue;
        }

        let planned = plan_resource(resource, declared.get(label), recorded.get(label));
        if let Some(plan) = &planned.plan {
            for diag in resource.validate(plan) {
                diagnostics.push((address.clone(), diag));
            }
        }
        log::debug!("Planned {} for {address}", planned.action);
        steps.push(Step {
            label: label.clone(),
            planned,
        });
    }
    steps
}
