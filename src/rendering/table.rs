//! Terminal rendering of a surface as an A x B matrix.
//!
//! ```text
//! churn by price (rows) x competitor (columns)
//!
//!   price \ competitor      80      90     100
//!                  10  0.1200  0.1850  0.2400
//!                  20  0.3100  0.4420  0.5010
//! ```
//!
//! Cells are banded by where the mean sits in the surface's range:
//! low values blue, middle default, high values red.

use owo_colors::{OwoColorize, Style};

use crate::surface::Surface;

/// Position of a mean within the surface's finite range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Middle,
    High,
    /// No finite prediction for this pair.
    Empty,
}

impl Band {
    pub fn of(mean: f64, range: Option<(f64, f64)>) -> Self {
        let Some((lo, hi)) = range else {
            return Band::Empty;
        };
        if !mean.is_finite() {
            return Band::Empty;
        }
        if hi <= lo {
            return Band::Middle;
        }
        let t = (mean - lo) / (hi - lo);
        if t < 1.0 / 3.0 {
            Band::Low
        } else if t > 2.0 / 3.0 {
            Band::High
        } else {
            Band::Middle
        }
    }

    pub fn style(&self) -> Style {
        match self {
            Band::Low => Style::new().bright_blue(),
            Band::Middle => Style::new(),
            Band::High => Style::new().bright_red().bold(),
            Band::Empty => Style::new().dimmed(),
        }
    }
}

/// Renders a [`Surface`] for the terminal.
pub struct TableRenderer {
    color: bool,
    precision: usize,
}

impl TableRenderer {
    pub fn new(color: bool) -> Self {
        Self { color, precision: 4 }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn render(&self, surface: &Surface) -> String {
        let axis_a = surface.axis_a();
        let axis_b = surface.axis_b();
        let range = surface.mean_range();

        let corner = format!("{} \\ {}", surface.column_a, surface.column_b);
        let row_labels: Vec<String> = axis_a.iter().map(|v| v.to_string()).collect();
        let col_labels: Vec<String> = axis_b.iter().map(|v| v.to_string()).collect();

        let cells: Vec<Vec<(String, Band)>> = axis_a
            .iter()
            .map(|a| {
                axis_b
                    .iter()
                    .map(|b| match surface.mean_at(a, b) {
                        Some(m) if m.is_finite() => (format!("{:.*}", self.precision, m), Band::of(m, range)),
                        _ => ("-".to_string(), Band::Empty),
                    })
                    .collect()
            })
            .collect();

        let label_width = row_labels
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(corner.chars().count()))
            .max()
            .unwrap_or(0);
        let col_width = col_labels
            .iter()
            .map(|l| l.chars().count())
            .chain(cells.iter().flatten().map(|(s, _)| s.chars().count()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let title = format!(
            "{} by {} (rows) x {} (columns)",
            surface.target.name, surface.column_a, surface.column_b
        );
        out.push_str(&self.paint(&title, Style::new().bold()));
        out.push_str("\n\n");

        out.push_str(&format!("  {:>width$}", corner, width = label_width));
        for label in &col_labels {
            let padded = format!("{:>width$}", label, width = col_width);
            out.push_str("  ");
            out.push_str(&self.paint(&padded, Style::new().cyan()));
        }
        out.push('\n');

        for (label, row) in row_labels.iter().zip(&cells) {
            let padded = format!("{:>width$}", label, width = label_width);
            out.push_str("  ");
            out.push_str(&self.paint(&padded, Style::new().cyan()));
            for (text, band) in row {
                let padded = format!("{:>width$}", text, width = col_width);
                out.push_str("  ");
                out.push_str(&self.paint(&padded, band.style()));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "\n  {} base rows per pair, seed {}\n",
            surface.sample_count, surface.seed
        ));
        out
    }

    // Styling is applied after padding so escape codes don't skew widths.
    fn paint(&self, s: &str, style: Style) -> String {
        if self.color {
            s.style(style).to_string()
        } else {
            s.to_string()
        }
    }
}
