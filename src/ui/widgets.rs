//! UI widgets for the warehouse dashboard.

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::centered_rect;
use super::theme::Theme;
use crate::data::{primary_key_for, TableStatus};

/// One row of the table list
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub name: String,
    pub status: TableStatus,
    pub rows: Option<usize>,
}

fn panel_block<'a>(title: String, focused: bool, theme: &Theme) -> Block<'a> {
    let (border_style, title_style) = theme.panel_styles(focused);
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Double
        } else {
            BorderType::Plain
        })
        .border_style(border_style)
        .title_style(title_style)
}

/// Table list panel widget
pub struct TableList<'a> {
    entries: &'a [TableEntry],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> TableList<'a> {
    pub fn new(entries: &'a [TableEntry], selected: usize, theme: &'a Theme) -> Self {
        TableList {
            entries,
            selected,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let (style, marker) = self.theme.table_status(entry.status);
                let mut spans = vec![
                    Span::styled(format!("{marker} "), style),
                    Span::raw(entry.name.clone()),
                ];
                if let Some(rows) = entry.rows {
                    spans.push(Span::styled(
                        format!(" ({rows})"),
                        Style::default().add_modifier(Modifier::DIM),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let loaded = self
            .entries
            .iter()
            .filter(|e| e.status == TableStatus::Loaded)
            .count();
        let block = panel_block(
            format!(" Tables ({loaded}/{}) ", self.entries.len()),
            focused,
            self.theme,
        );

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if !self.entries.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Column names and types of the selected table; the primary key is starred
pub struct ColumnsPanel<'a> {
    table: &'a str,
    columns: &'a [(String, String)],
    theme: &'a Theme,
}

impl<'a> ColumnsPanel<'a> {
    pub fn new(table: &'a str, columns: &'a [(String, String)], theme: &'a Theme) -> Self {
        ColumnsPanel {
            table,
            columns,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let pk = primary_key_for(self.table);
        let lines: Vec<Line> = if self.columns.is_empty() {
            vec![Line::styled(
                "Table not loaded",
                Style::default().add_modifier(Modifier::DIM),
            )]
        } else {
            self.columns
                .iter()
                .map(|(name, data_type)| {
                    let is_pk = pk == Some(name.as_str());
                    Line::from(vec![
                        Span::styled(
                            if is_pk { "* " } else { "  " },
                            self.theme.header_style(true),
                        ),
                        Span::styled(name.clone(), self.theme.header_style(is_pk)),
                        Span::styled(
                            format!("  {data_type}"),
                            Style::default().add_modifier(Modifier::DIM),
                        ),
                    ])
                })
                .collect()
        };

        let paragraph = Paragraph::new(lines)
            .block(panel_block(" Columns ".to_string(), false, self.theme))
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    source: &'a str,
    summary: Option<String>,
    loaded_at: Option<DateTime<Local>>,
    error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        source: &'a str,
        summary: Option<String>,
        loaded_at: Option<DateTime<Local>>,
        error: Option<&'a str>,
        theme: &'a Theme,
    ) -> Self {
        StatusBar {
            source,
            summary,
            loaded_at,
            error,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(e) = self.error {
            Line::styled(
                format!("Error: {e}"),
                Style::default().fg(self.theme.status_failed),
            )
        } else {
            let mut text = match &self.summary {
                Some(summary) => summary.clone(),
                None => format!("{}: not loaded", self.source),
            };
            if let Some(at) = self.loaded_at {
                text.push_str(&format!(" | loaded {}", at.format("%H:%M:%S")));
            }
            text.push_str(" | [h] Help [q] Quit");
            Line::raw(text)
        };

        let paragraph = Paragraph::new(line)
            .style(self.theme.normal_style())
            .block(Block::default().borders(Borders::TOP).border_style(self.theme.border_style()));

        frame.render_widget(paragraph, area);
    }
}

/// Popup showing the external BI dashboard link
pub struct LinkPopup<'a> {
    url: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> LinkPopup<'a> {
    pub fn new(url: Option<&'a str>, theme: &'a Theme) -> Self {
        LinkPopup { url, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(70, 25, area);
        frame.render_widget(Clear, popup_area);

        let lines = match self.url {
            Some(url) => vec![
                Line::from(""),
                Line::from("Open the BI dashboard in your browser:"),
                Line::from(""),
                Line::styled(
                    url.to_string(),
                    Style::default()
                        .fg(self.theme.title)
                        .add_modifier(Modifier::UNDERLINED),
                ),
            ],
            None => vec![
                Line::from(""),
                Line::styled(
                    "No BI dashboard configured.",
                    Style::default().add_modifier(Modifier::DIM),
                ),
                Line::from("Pass --dashboard-url or set BI_DASHBOARD_URL."),
            ],
        };

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" BI Dashboard ")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(self.theme.focused_border_style())
                    .title_style(self.theme.title_style())
                    .style(self.theme.surface_style()),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_table_list_shows_counts() {
        let theme = Theme::default();
        let entries = vec![
            TableEntry {
                name: "dim_staff".into(),
                status: TableStatus::Loaded,
                rows: Some(12),
            },
            TableEntry {
                name: "dim_currency".into(),
                status: TableStatus::Missing,
                rows: None,
            },
        ];
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal
            .draw(|f| TableList::new(&entries, 0, &theme).render(f, f.area(), true))
            .unwrap();

        let text = rendered_text(&terminal);
        assert!(text.contains("Tables (1/2)"));
        assert!(text.contains("dim_staff (12)"));
        assert!(text.contains("dim_currency"));
    }

    #[test]
    fn test_columns_panel_marks_primary_key() {
        let theme = Theme::default();
        let columns = vec![
            ("staff_id".to_string(), "Int64".to_string()),
            ("first_name".to_string(), "Utf8".to_string()),
        ];
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal
            .draw(|f| ColumnsPanel::new("dim_staff", &columns, &theme).render(f, f.area()))
            .unwrap();

        let text = rendered_text(&terminal);
        assert!(text.contains("* staff_id"));
        assert!(!text.contains("* first_name"));
    }

    #[test]
    fn test_link_popup_without_url() {
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|f| LinkPopup::new(None, &theme).render(f, f.area()))
            .unwrap();

        assert!(rendered_text(&terminal).contains("No BI dashboard configured."));
    }
}
