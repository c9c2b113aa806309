use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use tracing::{info, info_span, trace};

use medreport_cli::logging::redact_value;
use medreport_cli::output::{emit_reports, write_audit};
use medreport_core::{generate_batch_from, unknown_scopes};
use medreport_ingest::{read_rows, select_subject, subject_ids};
use medreport_rules::{RuleSet, available_languages, default_locale_dir, load_language};

use crate::cli::{CheckArgs, GenerateArgs, ListArgs, RuleArgs};
use crate::summary::apply_table_style;
use crate::types::GenerateResult;

fn locale_dir(args: &RuleArgs) -> PathBuf {
    args.locale_dir.clone().unwrap_or_else(default_locale_dir)
}

fn load_rules(args: &RuleArgs) -> Result<RuleSet> {
    let dir = locale_dir(args);
    load_language(&dir, &args.language).with_context(|| {
        format!(
            "load rule file for {} from {}",
            args.language,
            dir.display()
        )
    })
}

pub fn run_generate(args: &GenerateArgs) -> Result<GenerateResult> {
    let span = info_span!("generate", csv = %args.csv.display());
    let _guard = span.enter();
    let start = Instant::now();

    let rules = load_rules(&args.rules)?;
    let rows = read_rows(&args.csv)
        .with_context(|| format!("read registry export {}", args.csv.display()))?;
    let (rows, first_index) = match args.subject_id {
        Some(subject) => (
            vec![select_subject(rows, subject).context("select subject")?],
            subject,
        ),
        None => (rows, 1),
    };
    for (record_index, row) in (first_index..).zip(&rows) {
        let patient = row.get("patient_id").to_string();
        trace!(
            record_index,
            patient_id = redact_value(&patient),
            "queued record"
        );
    }

    let batch = generate_batch_from(&rules, &rows, first_index);
    emit_reports(&batch, args.output.as_deref())?;
    if let Some(path) = &args.audit {
        write_audit(&batch, path)?;
    }
    info!(
        records = batch.reports.len(),
        issues = batch.issues.len(),
        duration_ms = start.elapsed().as_millis(),
        "generation complete"
    );

    Ok(GenerateResult {
        language: rules.language().to_string(),
        batch,
        output: args.output.clone(),
        audit: args.audit.clone(),
    })
}

pub fn run_list(args: &ListArgs) -> Result<()> {
    let rows = read_rows(&args.csv)
        .with_context(|| format!("read registry export {}", args.csv.display()))?;
    for id in subject_ids(&rows) {
        println!("{id}");
    }
    Ok(())
}

pub fn run_check(args: &CheckArgs) -> Result<()> {
    let dir = locale_dir(&args.rules);
    let languages = available_languages(&dir)
        .with_context(|| format!("list rule files in {}", dir.display()))?;
    println!("Available languages: {}", languages.join(", "));
    let rules = load_rules(&args.rules)?;
    let mut table = Table::new();
    table.set_header(vec!["Section", "Variants", "Clauses"]);
    apply_table_style(&mut table);
    for (section, block) in rules.blocks() {
        table.add_row(vec![
            section.to_string(),
            block.variants.len().to_string(),
            block.clause_count().to_string(),
        ]);
    }
    println!("Language: {}", rules.language());
    println!("{table}");

    let mut labels = Table::new();
    labels.set_header(vec!["Label table", "Entries"]);
    apply_table_style(&mut labels);
    for (name, entries) in rules.label_tables() {
        labels.add_row(vec![name.to_string(), entries.len().to_string()]);
    }
    println!("{labels}");

    let mut settings = Table::new();
    settings.set_header(vec!["Setting", "Value"]);
    apply_table_style(&mut settings);
    for (key, value) in rules.settings().iter() {
        settings.add_row(vec![key, value]);
    }
    println!("{settings}");

    let unknown = unknown_scopes(&rules);
    if unknown.is_empty() {
        return Ok(());
    }
    let mut scopes = Table::new();
    scopes.set_header(vec!["Section", "Unknown scope"]);
    apply_table_style(&mut scopes);
    for (section, scope) in &unknown {
        scopes.add_row(vec![section.to_string(), scope.to_string()]);
    }
    println!("{scopes}");
    bail!(
        "{} condition scope(s) name fields no report section provides",
        unknown.len()
    );
}
