//! Execution engine - runs lifecycle operations and records their outcomes

use anyhow::Result;
use colored::Colorize;
use metabase_api::Client;
use reconcile::{
    Action, Address, DatabaseResource, Diagnostics, NewState, PermissionsGroupResource, Resource,
    Response, Target, UserResource,
};
use std::collections::BTreeSet;
use std::path::Path;

use super::differ::{display_diagnostics, display_plan};
use super::planner::{ExecutionPlan, Step};
use super::{Managed, Reported};
use crate::state::{ProviderState, record};

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Skip confirmation prompts
    pub yes: bool,
    /// Prompt shown before making changes
    pub prompt: Option<String>,
}

/// Summary of execution results
#[derive(Debug, Default)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Everything reported by the operations that ran
    pub diagnostics: Vec<Reported>,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn count(&mut self, action: Action) {
        match action {
            Action::Create => self.created += 1,
            Action::Update => self.updated += 1,
            Action::Replace => self.replaced += 1,
            Action::Delete => self.deleted += 1,
            Action::NoOp => {}
        }
    }
}

/// Where outcomes are recorded.
struct Recorder<'a> {
    state: &'a mut ProviderState,
    /// Save here after every change; in memory only when `None`
    path: Option<&'a Path>,
}

impl Recorder<'_> {
    /// Record an outcome, saving immediately when it changed anything.
    fn record<R: Managed>(&mut self, label: &str, outcome: NewState<R::Model>) -> Result<()> {
        if record(R::recorded_mut(self.state), label, outcome)
            && let Some(path) = self.path
        {
            self.state.touch(path)?;
        }
        Ok(())
    }
}

/// Show the plan, confirm, then apply it.
///
/// Deletes run first, dependents before dependencies (databases, users,
/// groups); creates and updates then run groups, users, databases. A
/// replacement is a delete followed by a create; the create is skipped if
/// the delete fails. State is saved after every change so an interrupted
/// run loses nothing already applied.
pub fn execute(
    client: &Client,
    plan: &ExecutionPlan,
    state: &mut ProviderState,
    state_path: &Path,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    // 1. Display what will change
    display_plan(plan);
    display_diagnostics(&plan.diagnostics);

    if plan.has_errors() {
        let invalid: BTreeSet<&Address> = plan
            .diagnostics
            .iter()
            .filter(|(_, d)| d.is_error())
            .map(|(address, _)| address)
            .collect();
        return Ok(ExecuteSummary {
            failed: invalid.len(),
            skipped: plan.changes().len().saturating_sub(invalid.len()),
            ..Default::default()
        });
    }

    let pending = plan.changes().len();
    if pending == 0 {
        return Ok(ExecuteSummary::default());
    }

    // 2. Confirm (unless --yes)
    let prompt = opts.prompt.as_deref().unwrap_or("Apply these changes?");
    if !opts.yes && !confirm_proceed(prompt)? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: pending,
            ..Default::default()
        });
    }

    println!();
    println!("  {} Applying {} changes...", "→".cyan(), pending);

    let mut summary = ExecuteSummary::default();
    let mut recorder = Recorder {
        state,
        path: Some(state_path),
    };

    // 3. Deletes, in reverse dependency order
    let db_blocked = run_deletes(
        &DatabaseResource,
        client,
        &plan.databases,
        &mut recorder,
        &mut summary,
    )?;
    let user_blocked =
        run_deletes(&UserResource, client, &plan.users, &mut recorder, &mut summary)?;
    let group_blocked = run_deletes(
        &PermissionsGroupResource,
        client,
        &plan.groups,
        &mut recorder,
        &mut summary,
    )?;

    // 4. Creates and updates, in dependency order
    run_applies(
        &PermissionsGroupResource,
        client,
        &plan.groups,
        &group_blocked,
        &mut recorder,
        &mut summary,
    )?;
    run_applies(
        &UserResource,
        client,
        &plan.users,
        &user_blocked,
        &mut recorder,
        &mut summary,
    )?;
    run_applies(
        &DatabaseResource,
        client,
        &plan.databases,
        &db_blocked,
        &mut recorder,
        &mut summary,
    )?;

    // 5. Summary
    display_diagnostics(&summary.diagnostics);
    print_summary(&summary);

    Ok(summary)
}

/// Run every delete and the delete half of every replacement.
///
/// Returns labels whose replacement must not proceed.
fn run_deletes<R: Managed>(
    resource: &R,
    client: &Client,
    steps: &[Step<R::Model>],
    recorder: &mut Recorder<'_>,
    summary: &mut ExecuteSummary,
) -> Result<Vec<String>> {
    let mut blocked = Vec::new();
    for step in steps {
        let action = step.planned.action;
        if !matches!(action, Action::Delete | Action::Replace) {
            continue;
        }
        let address = Address::new(R::KIND, step.label.as_str());
        let Some(prior) = R::recorded(recorder.state).get(&step.label).cloned() else {
            continue;
        };

        log::info!("Deleting {address}");
        let response = resource.delete(client, &prior);
        let failed = response.has_error();
        finish::<R>(&address, response, recorder, summary)?;

        if failed {
            summary.failed += 1;
            blocked.push(step.label.clone());
        } else if action == Action::Delete {
            report(&address, action);
            summary.count(action);
        }
    }
    Ok(blocked)
}

/// Run every create, update and the create half of every replacement.
fn run_applies<R: Managed>(
    resource: &R,
    client: &Client,
    steps: &[Step<R::Model>],
    blocked: &[String],
    recorder: &mut Recorder<'_>,
    summary: &mut ExecuteSummary,
) -> Result<()> {
    for step in steps {
        let action = step.planned.action;
        let Some(plan) = &step.planned.plan else {
            continue;
        };
        let address = Address::new(R::KIND, step.label.as_str());

        let response = match action {
            Action::Create | Action::Replace => {
                if blocked.contains(&step.label) {
                    summary.skipped += 1;
                    continue;
                }
                log::info!("Creating {address}");
                resource.create(client, plan)
            }
            Action::Update => {
                let Some(prior) = R::recorded(recorder.state).get(&step.label).cloned() else {
                    continue;
                };
                log::info!("Updating {address}");
                resource.update(client, plan, &prior)
            }
            Action::Delete | Action::NoOp => continue,
        };

        let failed = response.has_error();
        finish::<R>(&address, response, recorder, summary)?;
        if failed {
            summary.failed += 1;
        } else {
            report(&address, action);
            summary.count(action);
        }
    }
    Ok(())
}

/// Report diagnostics and record the new state.
fn finish<R: Managed>(
    address: &Address,
    response: Response<R::Model>,
    recorder: &mut Recorder<'_>,
    summary: &mut ExecuteSummary,
) -> Result<()> {
    let Response { state, diagnostics } = response;
    collect(address, diagnostics, summary);
    recorder.record::<R>(&address.label, state)
}

fn collect(address: &Address, diagnostics: Diagnostics, summary: &mut ExecuteSummary) {
    for diag in diagnostics {
        summary.diagnostics.push((address.clone(), diag));
    }
}

fn report(address: &Address, action: Action) {
    let verb = match action {
        Action::Create => "created",
        Action::Update => "updated",
        Action::Replace => "replaced",
        Action::Delete => "deleted",
        Action::NoOp => return,
    };
    println!("    {} {} {}", "✓".green(), address, verb.dimmed());
}

/// Refresh recorded state from Metabase.
///
/// Resources that no longer exist are dropped from state. With no
/// `state_path` the refreshed state is kept in memory only.
pub fn refresh(
    client: &Client,
    state: &mut ProviderState,
    state_path: Option<&Path>,
    target: Option<&Target>,
) -> Result<Vec<Reported>> {
    let mut summary = ExecuteSummary::default();
    let mut recorder = Recorder {
        state,
        path: state_path,
    };
    refresh_kind(&PermissionsGroupResource, client, target, &mut recorder, &mut summary)?;
    refresh_kind(&UserResource, client, target, &mut recorder, &mut summary)?;
    refresh_kind(&DatabaseResource, client, target, &mut recorder, &mut summary)?;
    Ok(summary.diagnostics)
}

fn refresh_kind<R: Managed>(
    resource: &R,
    client: &Client,
    target: Option<&Target>,
    recorder: &mut Recorder<'_>,
    summary: &mut ExecuteSummary,
) -> Result<()> {
    let labels: Vec<String> = R::recorded(recorder.state).keys().cloned().collect();
    for label in labels {
        let address = Address::new(R::KIND, label.as_str());
        if target.is_some_and(|t| !t.matches(&address)) {
            continue;
        }
        let Some(prior) = R::recorded(recorder.state).get(&label).cloned() else {
            continue;
        };
        log::debug!("Refreshing {address}");
        let response = resource.read(client, &prior);
        if response.state == NewState::Removed {
            println!("    {} {} {}", "-".red(), address, "no longer exists".dimmed());
        }
        finish::<R>(&address, response, recorder, summary)?;
    }
    Ok(())
}

/// Bring an existing object under management at `address`.
pub fn import<R: Managed>(
    resource: &R,
    client: &Client,
    state: &mut ProviderState,
    state_path: &Path,
    label: &str,
    id: &str,
) -> Result<Diagnostics> {
    let Response { state: outcome, diagnostics } = resource.import(client, id);
    if matches!(outcome, NewState::Set(_)) {
        record(R::recorded_mut(state), label, outcome);
        state.touch(state_path)?;
    }
    Ok(diagnostics)
}

/// Confirm with user
fn confirm_proceed(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.deleted > 0 {
        println!("    • {} resources deleted", summary.deleted);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
