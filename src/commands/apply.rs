use anyhow::{Result, bail};

use super::{Session, fail_on_errors, parse_target};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions, ExecutionPlan, differ};
use crate::ui;

/// Refresh, plan, confirm and apply.
pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let target = parse_target(args.target.as_deref())?;
    let Session {
        manifest,
        mut state,
        client,
    } = Session::open(ctx)?;

    if !args.no_refresh {
        let diagnostics = engine::refresh(&client, &mut state, Some(&ctx.state), target.as_ref())?;
        differ::display_diagnostics(&diagnostics);
        fail_on_errors(&diagnostics, "Refresh")?;
    }

    let plan = ExecutionPlan::build(&manifest, &state, target.as_ref());
    let opts = ExecuteOptions {
        yes: args.yes,
        prompt: None,
    };
    let summary = engine::execute(&client, &plan, &mut state, &ctx.state, &opts)?;

    if !summary.is_success() {
        bail!(
            "Apply failed: {} resource(s) could not be reconciled",
            summary.failed
        );
    }
    if summary.total_changes() > 0 && !ctx.quiet {
        ui::dim(&format!("State saved to {}", ctx.state.display()));
    }
    Ok(())
}
