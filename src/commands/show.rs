use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::{Attr, ResourceKind};

use crate::Context;
use crate::state::ProviderState;
use crate::ui;

/// Print recorded state: one line per resource, or full JSON with `-v`.
pub fn run(ctx: &Context) -> Result<()> {
    let state = ProviderState::load(&ctx.state)?;

    if ctx.verbose > 0 {
        let json = serde_json::to_string_pretty(&state).context("Failed to encode state")?;
        println!("{json}");
        return Ok(());
    }

    ui::header("Recorded State");
    ui::kv("file", &ctx.state.display().to_string());
    ui::kv("serial", &state.serial.to_string());
    ui::kv("updated", &state.last_updated.to_rfc3339());

    if state.is_empty() {
        println!();
        ui::dim("No resources recorded");
        return Ok(());
    }

    for kind in ResourceKind::ALL {
        let rows: Vec<(String, String, &Attr<i64>)> = match kind {
            ResourceKind::PermissionsGroup => state
                .permissions_group
                .iter()
                .map(|(label, m)| (label.clone(), m.name.clone(), &m.id))
                .collect(),
            ResourceKind::User => state
                .user
                .iter()
                .map(|(label, m)| (label.clone(), m.email.clone(), &m.id))
                .collect(),
            ResourceKind::Database => state
                .database
                .iter()
                .map(|(label, m)| (label.clone(), format!("{} ({})", m.name, m.engine), &m.id))
                .collect(),
        };
        if rows.is_empty() {
            continue;
        }
        ui::section(kind.as_str());
        for (label, description, id) in rows {
            let id = id.value().map_or_else(|| "?".to_string(), ToString::to_string);
            println!(
                "  {:<24} {:>6}  {}",
                label.bold(),
                format!("#{id}").dimmed(),
                description
            );
        }
    }
    Ok(())
}
