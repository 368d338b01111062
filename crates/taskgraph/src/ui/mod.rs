//! Terminal UI helpers.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::ai::{ComplexityAnalysisEntry, ComplexityLevel, ComplexityReport};
use crate::domain::DependencyReport;
use crate::entities::IdentifierInfo;

fn level_color(level: ComplexityLevel) -> Color {
    match level {
        ComplexityLevel::Low => Color::Green,
        ComplexityLevel::Medium => Color::Yellow,
        ComplexityLevel::High => Color::Red,
    }
}

/// Colored score string, e.g. `7.5/10`
pub fn score_colored(entry: &ComplexityAnalysisEntry) -> String {
    let score = format!("{:.1}/10", entry.complexity_score);
    match entry.level() {
        ComplexityLevel::Low => score.green().to_string(),
        ComplexityLevel::Medium => score.yellow().to_string(),
        ComplexityLevel::High => score.red().bold().to_string(),
    }
}

/// Create a table of report entries, most complex first.
pub fn complexity_table(report: &ComplexityReport) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Subtasks").fg(Color::Cyan),
        Cell::new("Expand").fg(Color::Cyan),
    ]);

    let mut entries: Vec<&ComplexityAnalysisEntry> = report.complexity_analysis.iter().collect();
    entries.sort_by(|a, b| {
        b.complexity_score
            .total_cmp(&a.complexity_score)
            .then(a.task_id.cmp(&b.task_id))
    });

    for entry in entries {
        let expand = if entry.complexity_score >= report.meta.threshold_score {
            "yes"
        } else {
            "-"
        };

        table.add_row(vec![
            Cell::new(entry.task_id),
            Cell::new(&entry.task_title),
            Cell::new(format!("{:.1}", entry.complexity_score)).fg(level_color(entry.level())),
            Cell::new(entry.recommended_subtasks),
            Cell::new(expand),
        ]);
    }

    table
}

/// Display a complexity report: metadata, level counts and the entry table
pub fn display_complexity_report(report: &ComplexityReport) {
    let meta = &report.meta;
    println!("{}", "═".repeat(60).dimmed());
    println!("{}", "Task Complexity Report".cyan().bold());
    println!("{}", "═".repeat(60).dimmed());

    if !meta.project_name.is_empty() {
        println!("{}: {}", "Project".bold(), meta.project_name);
    }
    println!(
        "{}: {}",
        "Generated".bold(),
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{}: {} of {} tasks in the last run, {} entries total",
        "Analyzed".bold(),
        meta.tasks_analyzed,
        meta.total_tasks,
        meta.analysis_count
    );
    println!(
        "{}: {}{}",
        "Threshold".bold(),
        meta.threshold_score,
        if meta.used_research { " (research)" } else { "" }
    );

    let summary = report.summary();
    println!(
        "{}: {} low, {} medium, {} high",
        "Complexity".bold(),
        summary.low.to_string().green(),
        summary.medium.to_string().yellow(),
        summary.high.to_string().red()
    );
    println!();

    if report.complexity_analysis.is_empty() {
        print_info("The report has no entries.");
        return;
    }

    println!("{}", complexity_table(report));

    let needing = report.tasks_needing_expansion();
    if !needing.is_empty() {
        println!();
        println!("{}", "Suggested expansions".bold().underline());
        for entry in needing {
            println!(
                "  {} {} {} [{}]",
                "•".dimmed(),
                entry.task_id.to_string().cyan(),
                entry.task_title,
                score_colored(entry)
            );
            if !entry.expansion_prompt.is_empty() {
                println!("    {}", entry.expansion_prompt.dimmed());
            }
        }
    }
}

/// Display dependency validation results
pub fn display_dependency_report(report: &DependencyReport) {
    if report.is_valid() {
        print_success("No dependency problems found");
        return;
    }

    if !report.cycles.is_empty() {
        println!(
            "{} ({})",
            "Circular dependencies".bold().underline(),
            report.cycles.len()
        );
        for cycle in &report.cycles {
            println!("  {} {}", "↻".red(), cycle);
        }
    }

    if !report.dangling.is_empty() {
        if !report.cycles.is_empty() {
            println!();
        }
        println!(
            "{} ({})",
            "Missing dependencies".bold().underline(),
            report.dangling.len()
        );
        for dangling in &report.dangling {
            println!(
                "  {} {} depends on {}, which does not exist",
                "•".dimmed(),
                dangling.from.cyan(),
                dangling.to.red()
            );
        }
    }
}

/// Display an identifier breakdown
pub fn display_identifier(raw: &str, info: &IdentifierInfo) {
    if !info.is_valid {
        print_error(&format!("'{raw}' is not a valid task identifier"));
        return;
    }

    let kind = if info.is_main_task {
        "task"
    } else if info.is_subtask {
        "subtask"
    } else if info.is_sub_subtask {
        "sub-subtask"
    } else {
        "nested subtask"
    };

    println!("{}: {}", "Identifier".bold(), raw.cyan());
    println!("{}: {} (level {})", "Kind".bold(), kind, info.level);
    println!(
        "{}: {}",
        "Parts".bold(),
        info.parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "{}: {}",
        "Parent".bold(),
        info.parent.as_deref().unwrap_or("-")
    );
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::RunSummary;

    #[test]
    fn test_complexity_table_orders_by_score() {
        let mut low = ComplexityAnalysisEntry::fallback(1, "Docs");
        low.complexity_score = 2.0;
        let mut high = ComplexityAnalysisEntry::fallback(2, "Payments");
        high.complexity_score = 9.0;

        let report = ComplexityReport::new(
            RunSummary {
                tasks_analyzed: 2,
                total_tasks: 2,
                threshold_score: 5.0,
                project_name: String::new(),
                used_research: false,
            },
            vec![low, high],
        );

        let rendered = complexity_table(&report).to_string();
        let payments = rendered.find("Payments").unwrap();
        let docs = rendered.find("Docs").unwrap();
        assert!(payments < docs);
    }
}
