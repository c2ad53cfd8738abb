use anyhow::{Context as AnyhowContext, Result};
use reconcile::{Address, NewState, ResourceKind, Response, data_sources};
use serde::Serialize;

use super::{fail_on_errors, provider_config};
use crate::Context;
use crate::cli::LookupCommand;
use crate::engine::{Reported, differ};

/// Fetch one object and print it as JSON.
pub fn run(ctx: &Context, cmd: LookupCommand) -> Result<()> {
    let client = provider_config(ctx)?.connect()?;

    match cmd {
        LookupCommand::Database { id } => print(
            Address::new(ResourceKind::Database, id.to_string()),
            data_sources::database(&client, id),
        ),
        LookupCommand::User { id } => print(
            Address::new(ResourceKind::User, id.to_string()),
            data_sources::user(&client, id),
        ),
        LookupCommand::CurrentUser => print(
            Address::new(ResourceKind::User, "current"),
            data_sources::current_user(&client),
        ),
        LookupCommand::Group { id } => print(
            Address::new(ResourceKind::PermissionsGroup, id.to_string()),
            data_sources::permissions_group(&client, id),
        ),
    }
}

fn print<M: Serialize>(address: Address, response: Response<M>) -> Result<()> {
    let Response { state, diagnostics } = response;
    let reported: Vec<Reported> = diagnostics
        .into_iter()
        .map(|d| (address.clone(), d))
        .collect();
    differ::display_diagnostics(&reported);
    fail_on_errors(&reported, "Lookup")?;

    if let NewState::Set(model) = state {
        let json = serde_json::to_string_pretty(&model).context("Failed to encode result")?;
        println!("{json}");
    }
    Ok(())
}
