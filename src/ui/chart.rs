//! Sales analysis widgets: a ranked table and a bar chart.

use ratatui::{
    layout::{Constraint, Direction, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use super::inspect::format_stat;
use super::theme::Theme;
use crate::analysis::{SalesAnalysis, SalesSummary};

/// Bar length for a sales total; bars cannot be negative
fn bar_value(amount: f64) -> u64 {
    if amount.is_finite() && amount > 0.0 {
        amount.round() as u64
    } else {
        0
    }
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

fn analysis_block<'a>(title: String, focused: bool, theme: &Theme) -> Block<'a> {
    let (border_style, title_style) = theme.panel_styles(focused);
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
        .title_style(title_style)
}

fn render_message(frame: &mut Frame, area: Rect, block: Block, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().add_modifier(Modifier::DIM))
        .alignment(ratatui::layout::Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Ranked totals of the current analysis with summary statistics
pub struct SalesTable<'a> {
    result: Result<&'a SalesSummary, &'a str>,
    analysis: SalesAnalysis,
    theme: &'a Theme,
}

impl<'a> SalesTable<'a> {
    pub fn new(
        result: Result<&'a SalesSummary, &'a str>,
        analysis: SalesAnalysis,
        theme: &'a Theme,
    ) -> Self {
        SalesTable {
            result,
            analysis,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let block = analysis_block(format!(" {} ", self.analysis), focused, self.theme);

        let summary = match self.result {
            Ok(summary) if !summary.rows.is_empty() => summary,
            Ok(_) => return render_message(frame, area, block, "No matching sales"),
            Err(e) => return render_message(frame, area, block, e),
        };

        let mut header: Vec<Cell> = self
            .analysis
            .label_columns()
            .iter()
            .map(|c| Cell::from(*c).style(self.theme.header_style(false)))
            .collect();
        header.push(Cell::from("total_sales_amount").style(self.theme.header_style(false)));

        let rows = summary.rows.iter().map(|row| {
            let mut cells: Vec<Cell> = row.labels.iter().map(|l| Cell::from(l.clone())).collect();
            cells.push(Cell::from(format_amount(row.total_sales_amount)));
            Row::new(cells)
        });

        let mut widths: Vec<Constraint> = self
            .analysis
            .label_columns()
            .iter()
            .map(|_| Constraint::Min(10))
            .collect();
        widths.push(Constraint::Length(18));

        let mut block = block;
        if let Some(stats) = summary.statistics() {
            block = block.title_bottom(Line::from(vec![
                Span::styled(" n=", Style::default().add_modifier(Modifier::DIM)),
                Span::raw(format!("{} ", stats.count)),
                Span::styled("mean=", Style::default().add_modifier(Modifier::DIM)),
                Span::raw(format!("{} ", format_stat(stats.mean))),
                Span::styled("max=", Style::default().add_modifier(Modifier::DIM)),
                Span::raw(format!("{} ", format_stat(stats.max))),
            ]));
        }

        let table = Table::new(rows, widths)
            .header(Row::new(header))
            .block(block)
            .style(self.theme.normal_style())
            .column_spacing(2);

        frame.render_widget(table, area);
    }
}

/// Horizontal bar chart of the current analysis.
///
/// The staff analysis is pivoted: one group per staff member with one bar
/// per location.
pub struct SalesChart<'a> {
    summary: Option<&'a SalesSummary>,
    theme: &'a Theme,
}

impl<'a> SalesChart<'a> {
    pub fn new(summary: Option<&'a SalesSummary>, theme: &'a Theme) -> Self {
        SalesChart { summary, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let summary = match self.summary {
            Some(s) if !s.rows.is_empty() => s,
            _ => {
                let block = analysis_block(" Chart ".to_string(), focused, self.theme);
                return render_message(frame, area, block, "No data available");
            }
        };

        let mut chart = BarChart::default()
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .group_gap(1)
            .style(self.theme.normal_style());

        let title = match summary.analysis {
            SalesAnalysis::ByStaffAndLocation => {
                let (staff, locations, values) = summary.pivot();
                for (name, row) in staff.iter().zip(&values) {
                    let bars: Vec<Bar> = row
                        .iter()
                        .enumerate()
                        .filter(|(_, amount)| **amount > 0.0)
                        .map(|(ci, amount)| {
                            Bar::default()
                                .value(bar_value(*amount))
                                .text_value(format_amount(*amount))
                                .label(Line::from(locations[ci].clone()))
                                .style(Style::default().fg(self.theme.chart_color(ci)))
                        })
                        .collect();
                    chart = chart.data(
                        BarGroup::default()
                            .label(Line::from(name.clone()))
                            .bars(&bars),
                    );
                }
                " Sales per staff, by location ".to_string()
            }
            _ => {
                let bars: Vec<Bar> = summary
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        Bar::default()
                            .value(bar_value(row.total_sales_amount))
                            .text_value(format_amount(row.total_sales_amount))
                            .label(Line::from(row.labels.join(" / ")))
                            .style(Style::default().fg(self.theme.chart_color(i)))
                    })
                    .collect();
                chart = chart.data(BarGroup::default().bars(&bars));
                format!(" {} ", summary.analysis)
            }
        };

        frame.render_widget(chart.block(analysis_block(title, focused, self.theme)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_value_clamps() {
        assert_eq!(bar_value(41.4), 41);
        assert_eq!(bar_value(-3.0), 0);
        assert_eq!(bar_value(f64::NAN), 0);
        assert_eq!(bar_value(0.0), 0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(20.0), "20.00");
        assert_eq!(format_amount(15.456), "15.46");
    }
}
