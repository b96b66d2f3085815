use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use casegen_core::{BatchPlan, BatchReport, BatchRun};
use casegen_model::{BatchStatus, JobOutcome, JobStatus};
use casegen_render::PreparedJob;

pub fn print_run_summary(run: &BatchRun) {
    println!("Output: {}", run.output_dir.display());
    if let Some(path) = &run.report_path {
        println!("Report: {}", path.display());
    }
    print_report(&run.report);
}

/// Per-case table followed by the status counts.
pub fn print_report(report: &BatchReport) {
    let outcomes = report.outcomes();
    if !outcomes.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Case"),
            header_cell("Status"),
            header_cell("Reason"),
            header_cell("Time (ms)"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 3, CellAlignment::Right);
        for outcome in &outcomes {
            table.add_row(vec![
                Cell::new(outcome.case.name()).add_attribute(Attribute::Bold),
                status_cell(&outcome.status),
                reason_cell(outcome),
                elapsed_cell(outcome),
            ]);
        }
        println!("{table}");
    }

    let summary = report.summary();
    let mut totals = Table::new();
    totals.set_header(vec![
        header_cell("Total"),
        header_cell("Succeeded"),
        header_cell("Failed"),
        header_cell("Skipped"),
        header_cell("Batch"),
    ]);
    apply_table_style(&mut totals);
    for index in 0..4 {
        align_column(&mut totals, index, CellAlignment::Right);
    }
    totals.add_row(vec![
        Cell::new(summary.total).add_attribute(Attribute::Bold),
        count_cell(summary.succeeded, Color::Green),
        count_cell(summary.failed, Color::Red),
        count_cell(summary.skipped, Color::Yellow),
        batch_status_cell(report.status()),
    ]);
    println!("{totals}");
}

/// Planned cases for `check`.
pub fn print_plan(plan: &BatchPlan) {
    println!("Output: {}", plan.layout().root().display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Case"),
        header_cell("Directory"),
        header_cell("Files"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    for job in plan.jobs() {
        let case = Cell::new(job.case().name()).add_attribute(Attribute::Bold);
        match job {
            PreparedJob::Ready(job) => {
                let files: Vec<&str> = job
                    .files
                    .iter()
                    .map(|file| file.file_name.as_str())
                    .collect();
                let directory = job
                    .case_dir
                    .strip_prefix(plan.layout().root())
                    .unwrap_or(job.case_dir.as_path());
                table.add_row(vec![
                    case,
                    Cell::new(directory.display()),
                    if files.is_empty() {
                        dim_cell("-")
                    } else {
                        Cell::new(files.join(", "))
                    },
                    Cell::new("ready").fg(Color::Green),
                ]);
            }
            PreparedJob::Rejected { reason, .. } => {
                table.add_row(vec![
                    case,
                    dim_cell("-"),
                    dim_cell("-"),
                    Cell::new(format!("rejected: {reason}")).fg(Color::Red),
                ]);
            }
        }
    }
    println!("{table}");
    println!(
        "{} case(s) planned, {} rejected",
        plan.len(),
        plan.rejected()
    );
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: &JobStatus) -> Cell {
    match status {
        JobStatus::Succeeded => Cell::new("OK")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        JobStatus::Failed(_) => Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        JobStatus::Skipped(_) => Cell::new("SKIPPED").fg(Color::Yellow),
    }
}

fn reason_cell(outcome: &JobOutcome) -> Cell {
    match (outcome.status.reason(), &outcome.diagnostic) {
        (Some(reason), Some(diagnostic)) => Cell::new(format!("{reason}\n{diagnostic}")),
        (Some(reason), None) => Cell::new(reason),
        (None, _) => dim_cell("-"),
    }
}

fn elapsed_cell(outcome: &JobOutcome) -> Cell {
    if outcome.status.is_skipped() {
        dim_cell("-")
    } else {
        Cell::new(outcome.elapsed_ms)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn batch_status_cell(status: BatchStatus) -> Cell {
    let color = match status {
        BatchStatus::AllDone => Color::Green,
        BatchStatus::PartiallyFailed => Color::Yellow,
        BatchStatus::Aborted => Color::Red,
    };
    Cell::new(status).fg(color).add_attribute(Attribute::Bold)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
