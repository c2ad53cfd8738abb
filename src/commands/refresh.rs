use anyhow::Result;

use super::{Session, fail_on_errors, parse_target};
use crate::Context;
use crate::engine::{self, differ};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let target = parse_target(target)?;
    let Session {
        mut state, client, ..
    } = Session::open(ctx)?;

    let before = state.len();
    let diagnostics = engine::refresh(&client, &mut state, Some(&ctx.state), target.as_ref())?;
    differ::display_diagnostics(&diagnostics);
    fail_on_errors(&diagnostics, "Refresh")?;

    if !ctx.quiet {
        let dropped = before.saturating_sub(state.len());
        if dropped > 0 {
            ui::warn(&format!("{dropped} resource(s) no longer exist and were dropped from state"));
        }
        ui::success(&format!("Refreshed {} resource(s)", state.len()));
    }
    Ok(())
}
