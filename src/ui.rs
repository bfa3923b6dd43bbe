use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{Table, Tabled};

use crate::report::Summary;
use crate::resolver::{Resolution, ResolutionStatus};

/// Terminal status output. Everything goes to stderr so reports can be piped.
pub struct UIManager {
    quiet: bool,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Count")]
    count: usize,
}

#[derive(Tabled)]
struct ColorRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Color")]
    name: String,
    #[tabled(rename = "Hex")]
    hex: String,
}

impl UIManager {
    pub fn new(colors_enabled: bool) -> Self {
        colored::control::set_override(colors_enabled);
        Self { quiet: false }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn print_header(&self, title: &str) {
        if !self.quiet {
            eprintln!("\n{}", title.bold().underline());
        }
    }

    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", "✓".green(), message);
        }
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "!".yellow(), message.yellow());
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }

    /// One line per model as it finishes
    pub fn format_resolution(&self, resolution: &Resolution) -> String {
        let status = match resolution.status {
            ResolutionStatus::Resolved => resolution.status.as_str().green(),
            ResolutionStatus::Deferred => resolution.status.as_str().yellow(),
            ResolutionStatus::Unmatched => resolution.status.as_str().red(),
        };
        let target = resolution.catalog_id.as_deref().unwrap_or("-");
        let line = format!(
            "{} {} -> {} [{}] {} colors",
            status,
            resolution.stem,
            target,
            resolution.method,
            resolution.colors.len()
        );
        match &resolution.note {
            Some(note) if !resolution.is_resolved() => format!("{} ({})", line, note),
            _ => line,
        }
    }

    pub fn create_progress(&self, total: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar
    }

    pub fn format_summary(&self, summary: &Summary) -> String {
        let mut rows: Vec<SummaryRow> = summary
            .by_status
            .iter()
            .map(|(status, count)| SummaryRow {
                outcome: status.to_string(),
                count: *count,
            })
            .collect();
        rows.extend(summary.by_method.iter().map(|(method, count)| SummaryRow {
            outcome: format!("  via {}", method),
            count: *count,
        }));
        rows.push(SummaryRow {
            outcome: "total".to_string(),
            count: summary.total,
        });
        Table::new(rows).to_string()
    }

    pub fn format_colors(&self, colors: &[crate::catalog::KnownColor]) -> String {
        let rows: Vec<ColorRow> = colors
            .iter()
            .map(|color| ColorRow {
                id: color.id,
                name: color.name.clone(),
                hex: format!("#{}", color.hex),
            })
            .collect();
        Table::new(rows).to_string()
    }
}
