//! Scrollable grid over the rows of a loaded table.

use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table as GridTable},
    Frame,
};

use super::theme::Theme;
use crate::data::{primary_key_for, Table};

const NULL_TEXT: &str = "null";
const MAX_CELL_WIDTH: usize = 24;

/// Render a window of rows as strings, nulls as [`NULL_TEXT`]
pub fn visible_cells(table: &Table, offset: usize, limit: usize) -> Vec<Vec<Option<String>>> {
    let end = (offset + limit).min(table.num_rows());
    let options = FormatOptions::default().with_null(NULL_TEXT);
    let formatters: Vec<Option<ArrayFormatter>> = table
        .batch
        .columns()
        .iter()
        .map(|array| ArrayFormatter::try_new(array.as_ref(), &options).ok())
        .collect();

    (offset..end)
        .map(|row| {
            table
                .batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(array, formatter)| {
                    if array.is_null(row) {
                        None
                    } else {
                        Some(
                            formatter
                                .as_ref()
                                .map(|f| f.value(row).to_string())
                                .unwrap_or_else(|| "?".to_string()),
                        )
                    }
                })
                .collect()
        })
        .collect()
}

/// Data grid widget showing the selected table from `offset`
pub struct DataGrid<'a> {
    table: Option<&'a Table>,
    title: String,
    offset: usize,
    theme: &'a Theme,
}

impl<'a> DataGrid<'a> {
    pub fn new(table: Option<&'a Table>, title: String, offset: usize, theme: &'a Theme) -> Self {
        DataGrid {
            table,
            title,
            offset,
            theme,
        }
    }

    /// Rows that fit in `area` below the border and header
    pub fn page_size(area: Rect) -> usize {
        area.height.saturating_sub(3) as usize
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let (border_style, title_style) = self.theme.panel_styles(focused);

        let Some(table) = self.table else {
            let block = Block::default()
                .title(format!(" {} ", self.title))
                .borders(Borders::ALL)
                .border_style(border_style)
                .title_style(title_style);
            let message = Paragraph::new("No data available")
                .style(Style::default().add_modifier(Modifier::DIM))
                .alignment(ratatui::layout::Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        };

        let page = Self::page_size(area);
        let cells = visible_cells(table, self.offset, page);
        let names = table.column_names();
        let pk = primary_key_for(&table.name);

        let widths: Vec<Constraint> = names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let widest = cells
                    .iter()
                    .map(|row| {
                        row[col]
                            .as_deref()
                            .unwrap_or(NULL_TEXT)
                            .chars()
                            .count()
                    })
                    .max()
                    .unwrap_or(0);
                Constraint::Length(widest.max(name.chars().count()).clamp(4, MAX_CELL_WIDTH) as u16)
            })
            .collect();

        let header = Row::new(names.iter().map(|name| {
            Cell::from(name.clone()).style(self.theme.header_style(pk == Some(name.as_str())))
        }));

        let rows = cells.into_iter().map(|row| {
            Row::new(row.into_iter().map(|value| match value {
                Some(text) => Cell::from(text),
                None => Cell::from(NULL_TEXT).style(self.theme.null_style()),
            }))
        });

        let last = (self.offset + page).min(table.num_rows());
        let first = if table.num_rows() == 0 { 0 } else { self.offset + 1 };
        let block = Block::default()
            .title(format!(
                " {} [{first}-{last} of {}] ",
                self.title,
                table.num_rows()
            ))
            .borders(Borders::ALL)
            .border_type(if focused {
                BorderType::Double
            } else {
                BorderType::Plain
            })
            .border_style(border_style)
            .title_style(title_style);

        let grid = GridTable::new(rows, widths)
            .header(header)
            .block(block)
            .style(self.theme.normal_style())
            .column_spacing(2);

        frame.render_widget(grid, area);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;

    fn staff() -> Table {
        let ids: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3]));
        let names: ArrayRef = Arc::new(StringArray::from(vec![Some("Ann"), None, Some("Cy")]));
        let batch = RecordBatch::try_from_iter(vec![("staff_id", ids), ("first_name", names)]).unwrap();
        Table::new("dim_staff", batch)
    }

    #[test]
    fn test_visible_cells_window() {
        let table = staff();
        let cells = visible_cells(&table, 1, 10);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0], vec![Some("2".to_string()), None]);
        assert_eq!(cells[1], vec![Some("3".to_string()), Some("Cy".to_string())]);
    }

    #[test]
    fn test_visible_cells_past_end() {
        assert!(visible_cells(&staff(), 5, 10).is_empty());
    }

    #[test]
    fn test_grid_renders_header_and_nulls() {
        let theme = Theme::default();
        let table = staff();
        let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
        terminal
            .draw(|f| {
                DataGrid::new(Some(&table), "dim_staff".into(), 0, &theme).render(f, f.area(), true)
            })
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("staff_id"));
        assert!(text.contains("first_name"));
        assert!(text.contains("null"));
        assert!(text.contains("[1-3 of 3]"));
    }
}
