//! Plan and diagnostic display

use colored::{ColoredString, Colorize};
use reconcile::{Action, FieldChange};
use serde_json::Value;

use super::Reported;
use super::planner::{ExecutionPlan, PlanEntry};
use crate::ui;

const VALUE_WIDTH: usize = 60;

/// Display the changes in a plan
pub fn display_plan(plan: &ExecutionPlan) {
    let changes = plan.changes();
    if changes.is_empty() {
        println!();
        println!("  {} No changes. Metabase matches the manifest.", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for entry in &changes {
        display_entry(entry);
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} to add, {} to change, {} to replace, {} to destroy",
        plan.count(Action::Create).to_string().green(),
        plan.count(Action::Update).to_string().yellow(),
        plan.count(Action::Replace).to_string().magenta(),
        plan.count(Action::Delete).to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn display_entry(entry: &PlanEntry<'_>) {
    println!(
        "│ {} {} {}",
        symbol(entry.action),
        entry.address.bold(),
        format!("will be {}", past_tense(entry.action)).dimmed()
    );
    if entry.action == Action::Delete {
        return;
    }
    for change in entry.changes {
        println!("│     {}", describe_change(change));
    }
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Create => "created",
        Action::Update => "updated in-place",
        Action::Replace => "replaced",
        Action::Delete => "destroyed",
        Action::NoOp => "left unchanged",
    }
}

/// One attribute line, e.g. `name: "Old" → "New"`.
pub fn describe_change(change: &FieldChange) -> String {
    let render = |value: Option<&Value>| match value {
        None => "(known after apply)".to_string(),
        Some(_) if change.sensitive => ui::SENSITIVE.to_string(),
        Some(value) => ui::truncate(&value.to_string(), VALUE_WIDTH),
    };
    match (&change.before, &change.after) {
        (None, after) => format!("{} = {}", change.name, render(after.as_ref())),
        (Some(before), after) => format!(
            "{}: {} → {}",
            change.name,
            render(Some(before)),
            render(after.as_ref())
        ),
    }
}

/// Display diagnostics grouped after a plan or operation
pub fn display_diagnostics(diagnostics: &[Reported]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    for (address, diag) in diagnostics {
        ui::diagnostic(&address.to_string(), diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(before: Option<Value>, after: Option<Value>, sensitive: bool) -> FieldChange {
        FieldChange {
            name: "details_secure".into(),
            before,
            after,
            sensitive,
        }
    }

    #[test]
    fn test_sensitive_values_are_masked() {
        let line = describe_change(&change(
            Some(json!(r#"{"password":"old"}"#)),
            Some(json!(r#"{"password":"new"}"#)),
            true,
        ));
        assert!(!line.contains("old"));
        assert!(!line.contains("new"));
        assert!(line.contains(ui::SENSITIVE));
    }

    #[test]
    fn test_create_shows_assignment() {
        let line = describe_change(&change(None, Some(json!("Analysts")), false));
        assert_eq!(line, "details_secure = \"Analysts\"");
    }

    #[test]
    fn test_unknown_after_apply() {
        let line = describe_change(&change(Some(json!(3)), None, false));
        assert_eq!(line, "details_secure: 3 → (known after apply)");
    }

    #[test]
    fn test_long_values_are_truncated() {
        let long = "x".repeat(200);
        let line = describe_change(&change(None, Some(json!(long)), false));
        assert!(line.ends_with("..."));
        assert!(line.len() < 100);
    }
}
