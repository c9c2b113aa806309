use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use medreport_cli::output::issue_detail;
use medreport_model::IssueKind;

use crate::types::GenerateResult;

/// Prints the run summary to stderr; stdout is reserved for report text.
pub fn print_summary(result: &GenerateResult) {
    eprintln!("Language: {}", result.language);
    if let Some(path) = &result.output {
        eprintln!("Reports: {}", path.display());
    }
    if let Some(path) = &result.audit {
        eprintln!("Audit: {}", path.display());
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Subject"),
        header_cell("Sections"),
        header_cell("Characters"),
        header_cell("Issues"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 0..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_characters = 0usize;
    for (record_index, report) in result.batch.indexed_reports() {
        let characters = report.text().chars().count();
        total_characters += characters;
        table.add_row(vec![
            Cell::new(record_index),
            report.subject_id.map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(report.paragraphs().count()),
            Cell::new(characters),
            count_cell(report.issues.len()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.batch.reports.len()).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(total_characters).add_attribute(Attribute::Bold),
        count_cell(result.batch.issues.len()).add_attribute(Attribute::Bold),
    ]);
    eprintln!("{table}");
    print_issue_table(result);
}

fn print_issue_table(result: &GenerateResult) {
    if result.batch.issues.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Section"),
        header_cell("Kind"),
        header_cell("Detail"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (record_index, issue) in &result.batch.issues {
        table.add_row(vec![
            Cell::new(record_index),
            Cell::new(issue.section).fg(Color::Blue),
            kind_cell(issue.kind),
            Cell::new(issue_detail(issue)),
        ]);
    }
    eprintln!();
    eprintln!("Issues:");
    eprintln!("{table}");
}

fn kind_cell(kind: IssueKind) -> Cell {
    match kind {
        IssueKind::UnresolvedScope => Cell::new(kind).fg(Color::Red),
        IssueKind::UnknownLabel | IssueKind::MissingLabelTable => Cell::new(kind).fg(Color::Yellow),
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Fixed(26)),
            ColumnConstraint::UpperBoundary(Width::Fixed(22)),
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
