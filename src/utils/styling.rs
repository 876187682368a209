//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static HEART: Emoji<'_, '_> = Emoji("🫀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("cardiopipe").red().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("Heart-disease survey pipeline and ensemble predictor").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print a boxed card of `(label, value)` rows
pub fn print_config(title: &str, rows: &[(&str, String)]) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);
    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let value_width = box_width.saturating_sub(label_width + 6);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style(title).cyan().bold(),
        " ".repeat(box_width.saturating_sub(title.chars().count() + 3))
    );
    println!("    ├{}┤", line);
    for (label, value) in rows {
        println!(
            "    │  {:<lw$} {:<vw$}│",
            label,
            truncate_string(value, value_width),
            lw = label_width,
            vw = value_width
        );
    }
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print the final completion message
pub fn print_completion(stage: &str) {
    println!();
    println!(
        "    {} {}",
        HEART,
        style(format!("{} complete!", stage)).green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      {} {}", style(count).yellow().bold(), description);
    }
}

/// Print where a file was written
pub fn print_saved(what: &str, path: &Path) {
    println!("    {} {} {}", SAVE, what, style(truncate_path(path, 60)).cyan());
}

/// Print where a file was read from
pub fn print_loaded(what: &str, path: &Path) {
    println!("    {} {} {}", FOLDER, what, style(truncate_path(path, 60)).cyan());
}

pub fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

/// Keep the tail of `s`, prefixed with `...`, when it is longer than `max_len` chars.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else {
        let keep = max_len.saturating_sub(3);
        let tail: String = s.chars().skip(len - keep).collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("data/preprocessed2015.csv", 12), "...d2015.csv");
        assert_eq!(truncate_string("ééééé", 4), "...é");
    }
}
