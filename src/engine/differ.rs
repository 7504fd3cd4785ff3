//! Plan display

use crate::ui;
use colored::Colorize;
use declarative::{Action, AttributeChange, ChangeDiff, DiffSummary, group_by_type};

/// Human-readable heading for a resource type
fn type_heading(type_name: &str) -> &str {
    match type_name {
        "application" => "Applications",
        "environment" => "Environments",
        "environment_group" => "Environment groups",
        "profile" => "Profiles",
        "profile_permission" => "Profile permissions",
        "constraint" => "Constraints",
        "profile_policy" => "Profile policies",
        "policy_prioritization" => "Policy prioritization",
        "advanced_settings" => "Advanced settings",
        "resource_manager_profile" => "Resource-manager profiles",
        "tag_member" => "Tag members",
        other => other,
    }
}

fn action_symbol(action: Action) -> colored::ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
    }
}

fn action_desc(action: Action) -> &'static str {
    match action {
        Action::Create => "(will create)",
        Action::Update => "(will update in place)",
        Action::Replace => "(must be replaced)",
        Action::Delete => "(will remove)",
    }
}

/// One-line rendering of an attribute change, if it fits on a line
fn attribute_line(change: &AttributeChange) -> Option<String> {
    let render = |v: &Option<serde_json::Value>| v.as_ref().map(ui::format_value);
    let before = change.before.as_ref();
    let after = change.after.as_ref();
    if before.is_some_and(ui::is_structured) && after.is_some_and(ui::is_structured) {
        return None;
    }
    Some(match (render(&change.before), render(&change.after)) {
        (None, Some(new)) => format!("{} = {new}", change.name),
        (Some(old), None) => format!("{} = {old}", change.name),
        (Some(old), Some(new)) => format!("{}: {old} → {new}", change.name),
        (None, None) => change.name.clone(),
    })
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ChangeDiff], verbose: bool) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (type_name, type_diffs) in group_by_type(diffs) {
        println!("│ {}", type_heading(type_name).bold());

        for diff in type_diffs {
            println!(
                "│   {} {:<40} {}",
                action_symbol(diff.action),
                diff.address,
                action_desc(diff.action).dimmed()
            );
            if diff.action == Action::Delete && !verbose {
                continue;
            }
            for change in &diff.attributes {
                match attribute_line(change) {
                    Some(line) => println!("│       {}", line.dimmed()),
                    None => {
                        println!("│       {}:", change.name.dimmed());
                        if let (Some(before), Some(after)) = (&change.before, &change.after) {
                            ui::print_json_diff(before, after, "│         ");
                        }
                    }
                }
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to update, {} to replace, {} to remove)",
        summary.total().to_string().bold(),
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.deletes.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
