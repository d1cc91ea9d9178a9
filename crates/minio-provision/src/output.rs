//! Terminal output utilities

use crate::summary::{LineKind, ReportLine};
use console::style;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print report lines under a header
pub fn report(title: &str, lines: &[ReportLine]) {
    header(title);
    for line in lines {
        match line.kind {
            LineKind::Success => success(&line.text),
            LineKind::Info => info(&line.text),
            LineKind::Warning => warning(&line.text),
            LineKind::Error => error(&line.text),
        }
    }
}
