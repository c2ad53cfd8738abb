use anyhow::Result;

use super::{Session, fail_on_errors, parse_target};
use crate::Context;
use crate::engine::{self, ExecutionPlan, differ};
use crate::ui;

/// Show what apply would change. Recorded state is refreshed in memory only.
pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let target = parse_target(target)?;
    let Session {
        manifest,
        mut state,
        client,
    } = Session::open(ctx)?;
    if manifest.is_empty() && !ctx.quiet {
        ui::warn(&format!(
            "{} declares no resources; everything recorded will be planned for deletion",
            ctx.manifest.display()
        ));
    }

    let mut diagnostics = engine::refresh(&client, &mut state, None, target.as_ref())?;
    let plan = ExecutionPlan::build(&manifest, &state, target.as_ref());

    differ::display_plan(&plan);
    diagnostics.extend(plan.diagnostics.iter().cloned());
    differ::display_diagnostics(&diagnostics);

    fail_on_errors(&diagnostics, "Plan")
}
