//! Terminal summaries for each stage

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::{ClassificationReport, SearchOutcome};
use crate::pipeline::{ColumnProfile, ExtractionReport};

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Row accounting and label distribution of an extraction run.
pub fn display_extraction(report: &ExtractionReport) {
    print_section("📋", "EXTRACTION SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Metric", "Value"]));
    table.add_row(vec![Cell::new("📁 Rows read"), Cell::new(report.rows_in)]);
    table.add_row(vec![
        Cell::new("🗑️  Rows dropped (missing)"),
        Cell::new(report.rows_dropped).fg(if report.rows_dropped == 0 {
            Color::White
        } else {
            Color::Red
        }),
    ]);
    table.add_row(vec![
        Cell::new("✅ Rows kept"),
        Cell::new(report.rows_out)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    let rate = report.drop_rate() * 100.0;
    let color = if rate > 50.0 {
        Color::Red
    } else if rate > 20.0 {
        Color::Yellow
    } else {
        Color::Cyan
    };
    table.add_row(vec![
        Cell::new("📉 Drop rate"),
        Cell::new(format!("{:.1}%", rate)).fg(color),
    ]);
    print_indented(&table);

    let with_missing: Vec<&(String, f64)> = report.missing_ratios.iter().filter(|(_, r)| *r > 0.0).collect();
    if !with_missing.is_empty() {
        print_section("🔍", "MISSING ANSWERS BY COLUMN");
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Column", "Missing", "Ratio"]));
        for (name, ratio) in with_missing {
            let count = report
                .missing_by_column
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, c)| *c)
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(name),
                Cell::new(count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}%", ratio * 100.0)).set_alignment(CellAlignment::Right),
            ]);
        }
        print_indented(&table);
    }

    if !report.label_counts.is_empty() {
        print_section("🫀", "OUTCOME LABELS");
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(header(&["Code", "Status", "Rows"]));
        for (status, count) in &report.label_counts {
            table.add_row(vec![
                Cell::new(status.code()),
                Cell::new(status.description()),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        print_indented(&table);
    }
}

/// Per-column profiles from the inspector.
pub fn display_profiles(profiles: &[ColumnProfile]) {
    print_section("🔎", "COLUMN PROFILES");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Column", "Type", "Nulls", "Unique", "Min", "Max", "Mean", "Values"]));
    for p in profiles {
        let (min, max, mean) = match p.stats {
            Some(s) => (format!("{}", s.min), format!("{}", s.max), format!("{:.3}", s.mean)),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        let mut values = p.unique.join(", ");
        if p.n_unique > p.unique.len() {
            values.push_str(", ...");
        }
        table.add_row(vec![
            Cell::new(&p.name).add_attribute(Attribute::Bold),
            Cell::new(&p.dtype).fg(Color::Cyan),
            Cell::new(p.nulls).fg(if p.nulls == 0 { Color::White } else { Color::Red }),
            Cell::new(p.n_unique),
            Cell::new(min),
            Cell::new(max),
            Cell::new(mean),
            Cell::new(values),
        ]);
    }
    print_indented(&table);
}

/// Best cross-validation score per family.
pub fn display_search_results(searches: &[SearchOutcome]) {
    print_section("🧪", "HYPERPARAMETER SEARCH");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Family", "Candidates", "Best CV accuracy"]));
    for search in searches {
        table.add_row(vec![
            Cell::new(search.family),
            Cell::new(search.candidates.len()),
            Cell::new(format!("{:.4}", search.best().mean_score))
                .fg(Color::Green)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    print_indented(&table);
}

/// Held-out classification report of the ensemble.
pub fn display_classification_report(report: &ClassificationReport) {
    print_section("📊", "CLASSIFICATION REPORT");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Class", "Precision", "Recall", "F1", "Support"]));
    let right = |text: String| Cell::new(text).set_alignment(CellAlignment::Right);
    for m in report
        .classes
        .iter()
        .chain([&report.macro_avg, &report.weighted_avg])
    {
        table.add_row(vec![
            Cell::new(&m.label),
            right(format!("{:.4}", m.precision)),
            right(format!("{:.4}", m.recall)),
            right(format!("{:.4}", m.f1)),
            right(m.support.to_string()),
        ]);
    }
    print_indented(&table);

    println!();
    println!(
        "    Accuracy: {}",
        style(format!("{:.4}", report.accuracy)).green().bold()
    );
}
