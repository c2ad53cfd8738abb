use anyhow::{Context as AnyhowContext, Result, bail};
use reconcile::{
    Address, DatabaseResource, PermissionsGroupResource, ResourceKind, UserResource,
};

use super::{Session, fail_on_errors};
use crate::Context;
use crate::engine::{self, Reported, differ};
use crate::ui;

/// Record an existing Metabase object under `address`.
pub fn run(ctx: &Context, address: &str, id: &str) -> Result<()> {
    let address: Address = address
        .parse()
        .with_context(|| format!("Invalid address '{address}'"))?;
    let Session {
        manifest,
        mut state,
        client,
    } = Session::open(ctx)?;

    if state.tracks(address.kind, &address.label) {
        bail!("{address} is already managed; remove it from state before importing");
    }
    if !manifest.declares(address.kind, &address.label) {
        ui::warn(&format!(
            "{address} is not declared in {}; the next apply will delete it",
            ctx.manifest.display()
        ));
    }

    let label = address.label.as_str();
    let diagnostics = match address.kind {
        ResourceKind::PermissionsGroup => engine::import(
            &PermissionsGroupResource,
            &client,
            &mut state,
            &ctx.state,
            label,
            id,
        )?,
        ResourceKind::User => {
            engine::import(&UserResource, &client, &mut state, &ctx.state, label, id)?
        }
        ResourceKind::Database => {
            engine::import(&DatabaseResource, &client, &mut state, &ctx.state, label, id)?
        }
    };

    let reported: Vec<Reported> = diagnostics
        .into_iter()
        .map(|d| (address.clone(), d))
        .collect();
    differ::display_diagnostics(&reported);
    fail_on_errors(&reported, "Import")?;

    ui::success(&format!("Imported {address} (ID {id})"));
    Ok(())
}
