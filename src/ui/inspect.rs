//! Describe and null-check panels for the selected table.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::theme::Theme;
use crate::analysis::{ColumnSummary, NullStrategy};

/// Format a statistic for a narrow cell
pub fn format_stat(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e7 || value.abs() < 1e-3) {
        format!("{value:.3e}")
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.3}")
    }
}

/// Descriptive statistics grid, one row per numeric column
pub struct StatsPanel<'a> {
    summaries: &'a [ColumnSummary],
    title: &'a str,
    theme: &'a Theme,
}

impl<'a> StatsPanel<'a> {
    pub fn new(summaries: &'a [ColumnSummary], title: &'a str, theme: &'a Theme) -> Self {
        StatsPanel {
            summaries,
            title,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title_style(self.theme.title_style());

        if self.summaries.is_empty() {
            let message = Paragraph::new("No numeric columns")
                .style(Style::default().add_modifier(Modifier::DIM))
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(
            ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
                .into_iter()
                .map(|h| Cell::from(h).style(self.theme.header_style(false))),
        );

        let rows = self.summaries.iter().map(|s| {
            Row::new(vec![
                Cell::from(s.column.clone()),
                Cell::from(s.count.to_string()),
                Cell::from(format_stat(s.mean)),
                Cell::from(s.std.map(format_stat).unwrap_or_else(|| "-".to_string())),
                Cell::from(format_stat(s.min)),
                Cell::from(format_stat(s.p25)),
                Cell::from(format_stat(s.p50)),
                Cell::from(format_stat(s.p75)),
                Cell::from(format_stat(s.max)),
            ])
        });

        let name_width = self
            .summaries
            .iter()
            .map(|s| s.column.chars().count())
            .max()
            .unwrap_or(6)
            .clamp(6, 24) as u16;
        let mut widths = vec![Constraint::Length(name_width), Constraint::Length(6)];
        widths.extend(std::iter::repeat(Constraint::Length(10)).take(7));

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .style(self.theme.normal_style())
            .column_spacing(1);

        frame.render_widget(table, area);
    }
}

/// Null counts per column plus the effect of the chosen strategy
pub struct NullPanel<'a> {
    counts: &'a [(String, usize)],
    strategy: NullStrategy,
    /// (rows, columns) before and after the strategy, or why it failed
    shapes: Result<((usize, usize), (usize, usize)), String>,
    theme: &'a Theme,
}

impl<'a> NullPanel<'a> {
    pub fn new(
        counts: &'a [(String, usize)],
        strategy: NullStrategy,
        shapes: Result<((usize, usize), (usize, usize)), String>,
        theme: &'a Theme,
    ) -> Self {
        NullPanel {
            counts,
            strategy,
            shapes,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let total: usize = self.counts.iter().map(|(_, n)| n).sum();
        let mut lines = vec![Line::from(vec![
            Span::raw("Strategy: "),
            Span::styled(self.strategy.to_string(), self.theme.title_style()),
            Span::styled("  [m] cycle", Style::default().add_modifier(Modifier::DIM)),
        ])];

        match &self.shapes {
            Ok(((rows, cols), (new_rows, new_cols))) => lines.push(Line::raw(format!(
                "Shape: {rows} x {cols} -> {new_rows} x {new_cols}"
            ))),
            Err(e) => lines.push(Line::styled(
                format!("Cannot apply strategy: {e}"),
                Style::default().fg(self.theme.status_failed),
            )),
        }
        lines.push(Line::from(""));

        if total == 0 {
            lines.push(Line::styled(
                "No null values",
                Style::default().fg(self.theme.status_loaded),
            ));
        } else {
            for (column, count) in self.counts.iter().filter(|(_, n)| *n > 0) {
                lines.push(Line::from(vec![
                    Span::raw(format!("{column}: ")),
                    Span::styled(
                        count.to_string(),
                        Style::default().fg(self.theme.status_missing),
                    ),
                ]));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(format!(" Null check ({total} nulls) "))
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style())
                    .title_style(self.theme.title_style()),
            )
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(3.0), "3");
        assert_eq!(format_stat(2.5), "2.500");
        assert_eq!(format_stat(0.0), "0");
        assert_eq!(format_stat(12_345_678.0), "1.235e7");
        assert_eq!(format_stat(0.0001), "1.000e-4");
    }
}
