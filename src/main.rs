use anyhow::Result;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::process;

use excel_consolidator::{
    Consolidator, EmptyReason, InsightGenerator, InsightReport, KeywordSet, MatchPolicy,
    RunDiagnostics, DEFAULT_EXPORT_NAME, DEFAULT_KEYWORDS,
};

/// Machine-readable run summary for `--json`.
#[derive(Serialize)]
struct RunOutput<'a> {
    rows: usize,
    columns: &'a [String],
    empty_reason: Option<EmptyReason>,
    diagnostics: &'a RunDiagnostics,
    report: &'a InsightReport,
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut files: Vec<PathBuf> = Vec::new();
    let mut keywords = DEFAULT_KEYWORDS.to_string();
    let mut policy = MatchPolicy::ColumnPriority;
    let mut out = PathBuf::from(DEFAULT_EXPORT_NAME);
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--keywords" | "-k" => {
                i += 1;
                match args.get(i) {
                    Some(value) => keywords = value.clone(),
                    None => return usage("--keywords requires a value"),
                }
            }
            "--out" | "-o" => {
                i += 1;
                match args.get(i) {
                    Some(value) => out = PathBuf::from(value),
                    None => return usage("--out requires a value"),
                }
            }
            "--row-only" => policy = MatchPolicy::RowOnly,
            "--no-keywords" => keywords = String::new(),
            "--json" => json = true,
            "--help" | "-h" => return usage(""),
            other => files.push(PathBuf::from(other)),
        }
        i += 1;
    }

    if files.is_empty() {
        return usage("no input workbooks given");
    }

    if json {
        run_json(&files, &keywords, policy, &out)
    } else {
        run_consolidation(&files, &keywords, policy, &out)
    }
}

/// JSON mode: everything on stdout is one JSON document, for callers that
/// embed the consolidator rather than read the prose output.
fn run_json(
    files: &[PathBuf],
    keywords: &str,
    policy: MatchPolicy,
    out: &std::path::Path,
) -> Result<()> {
    let consolidator = Consolidator::new(KeywordSet::parse(keywords), policy);
    let (table, diag) = consolidator.consolidate_paths(files);
    let report = InsightGenerator::new().generate(&table);

    if !table.is_empty() {
        excel_consolidator::write_workbook(&table, out)?;
    }

    let output = RunOutput {
        rows: table.row_count(),
        columns: table.columns(),
        empty_reason: diag.empty_reason(table.row_count()),
        diagnostics: &diag,
        report: &report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_consolidation(
    files: &[PathBuf],
    keywords: &str,
    policy: MatchPolicy,
    out: &std::path::Path,
) -> Result<()> {
    println!("📊 Workbook Consolidator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let keyword_set = KeywordSet::parse(keywords);
    if keyword_set.is_empty() {
        println!("\n📂 Reading {} workbook(s), no keyword filter...", files.len());
    } else {
        println!(
            "\n📂 Reading {} workbook(s), keywords: {}",
            files.len(),
            keyword_set.terms().join(", ")
        );
    }

    let consolidator = Consolidator::new(keyword_set, policy);
    let (table, diag) = consolidator.consolidate_paths(files);

    for warning in &diag.warnings {
        eprintln!("⚠️  Error reading {}: {}", warning.file, warning.error);
    }

    match diag.empty_reason(table.row_count()) {
        Some(EmptyReason::NoFilesRead) => {
            eprintln!("\n❌ No workbook could be opened.");
            process::exit(1);
        }
        Some(EmptyReason::NoRowsMatched) => {
            println!("\nNo rows matched the keywords. Nothing to export.");
            return Ok(());
        }
        Some(EmptyReason::AllRowsDropped) => {
            println!("\nAll rows were empty or duplicates. Nothing to export.");
            return Ok(());
        }
        None => {}
    }

    println!(
        "✓ Consolidated {} rows × {} columns from {} sheet(s)",
        table.row_count(),
        table.columns().len(),
        diag.sheets_read
    );
    if diag.duplicate_rows_dropped > 0 {
        println!("✓ Duplicates removed: {}", diag.duplicate_rows_dropped);
    }
    if diag.empty_rows_dropped > 0 {
        println!("✓ Empty rows removed: {}", diag.empty_rows_dropped);
    }

    let report = InsightGenerator::new().generate(&table);

    if !report.insights.is_empty() {
        println!("\n📌 Key Metrics");
        for insight in &report.insights {
            println!("  {}", insight);
        }
    }
    if !report.summaries.is_empty() {
        println!("\n🧠 Executive Summary");
        for summary in &report.summaries {
            println!("  - {}", summary);
        }
    }
    if report.coercion_failures > 0 {
        println!(
            "\n⚠️  {} cell(s) excluded from numeric aggregates:",
            report.coercion_failures
        );
        for note in &report.coercion_notes {
            println!("  - {}", note);
        }
    }

    excel_consolidator::write_workbook(&table, out)?;
    println!("\n💾 Wrote {}", out.display());

    Ok(())
}

fn usage(error: &str) -> Result<()> {
    if !error.is_empty() {
        eprintln!("❌ {}\n", error);
    }
    eprintln!("Usage: excel-consolidator <workbook.xlsx>... [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -k, --keywords <list>   Comma-separated keywords (default: \"{}\")", DEFAULT_KEYWORDS);
    eprintln!("      --no-keywords       Disable filtering entirely");
    eprintln!("      --row-only          Strict row filtering (no fallback on zero matches)");
    eprintln!("      --json              Emit one JSON document instead of prose");
    eprintln!("  -o, --out <path>        Export path (default: {})", DEFAULT_EXPORT_NAME);
    process::exit(if error.is_empty() { 0 } else { 1 });
}
