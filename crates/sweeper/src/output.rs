use colored::Colorize;
use sweeper_core::{SweepAction, SweepOutcome, SweepReport};

pub fn print_report(report: &SweepReport) {
    println!();
    if report.outcomes.is_empty() {
        println!("{}", "No resources found".dimmed());
    } else {
        println!(
            "{}",
            format!(
                "{:<22} {:<40} {:<9} {:<}",
                "TYPE", "NAME", "ACTION", "DETAIL"
            )
            .bold()
        );
        println!("{}", "─".repeat(100).dimmed());

        let mut outcomes: Vec<&SweepOutcome> = report.outcomes.iter().collect();
        outcomes.sort_by(|a, b| (a.resource_type, &a.id).cmp(&(b.resource_type, &b.id)));

        for outcome in outcomes {
            println!(
                "{:<22} {:<40} {} {}",
                outcome.resource_type.as_str(),
                short_name(&outcome.id),
                action_label(outcome.action),
                detail(outcome).dimmed()
            );
        }
    }

    if !report.enumeration_failures.is_empty() {
        println!();
        println!("{}", "Enumeration failures:".yellow().bold());
        for failure in &report.enumeration_failures {
            let scope = failure
                .scope
                .as_deref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            println!(
                "  {} {}{}: {}",
                "⚠".yellow(),
                failure.resource_type.as_str(),
                scope,
                failure.error
            );
        }
    }

    println!();
    let summary = report.summary();
    let line = format!("{} ({} ms)", summary, report.duration_ms);
    if report.is_clean() {
        println!("{} {}", "✓".green(), line.green());
    } else {
        println!("{} {}", "!".yellow(), line.yellow());
    }
}

pub fn print_json(report: &SweepReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn action_label(action: SweepAction) -> colored::ColoredString {
    match action {
        SweepAction::Deleted => format!("{:<9}", "deleted").red(),
        SweepAction::Skipped => format!("{:<9}", "skipped").normal(),
        SweepAction::Failed => format!("{:<9}", "failed").yellow().bold(),
    }
}

fn detail(outcome: &SweepOutcome) -> String {
    match (&outcome.reason, &outcome.error) {
        (_, Some(error)) => error.clone(),
        (Some(reason), None) => reason.to_string(),
        (None, None) => String::new(),
    }
}

fn short_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}
