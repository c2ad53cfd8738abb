use anyhow::{Result, bail};

use super::{Session, parse_target};
use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{self, ExecuteOptions, ExecutionPlan};
use crate::ui;

/// Delete every managed object, or those matching `--target`.
pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let target = parse_target(args.target.as_deref())?;
    let Session {
        manifest,
        mut state,
        client,
    } = Session::open(ctx)?;

    if state.is_empty() {
        ui::info("Nothing to destroy: no resources are recorded in state");
        return Ok(());
    }

    // Planning against an empty manifest turns every recorded resource
    // into a delete.
    let plan = ExecutionPlan::build(&manifest.emptied(), &state, target.as_ref());
    let opts = ExecuteOptions {
        yes: args.yes,
        prompt: Some("Destroy these resources? This cannot be undone".to_string()),
    };
    let summary = engine::execute(&client, &plan, &mut state, &ctx.state, &opts)?;

    if !summary.is_success() {
        bail!(
            "Destroy failed: {} resource(s) could not be deleted",
            summary.failed
        );
    }
    Ok(())
}
