//! Help overlay widget showing keyboard shortcuts.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::centered_rect;
use super::theme::Theme;

/// Help overlay showing all keyboard shortcuts
pub struct HelpOverlay<'a> {
    theme: &'a Theme,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        HelpOverlay { theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        // Center the help popup
        let popup_area = centered_rect(65, 85, area);

        // Clear the background
        frame.render_widget(Clear, popup_area);

        const DESCRIPTION: &str = "A terminal dashboard over the sales warehouse. Browse the latest Parquet snapshot of each table, inspect columns and nulls, and compare sales totals.";

        let shortcuts = [
            ("Navigation", vec![
                ("j / ↓", "Move down / scroll rows"),
                ("k / ↑", "Move up / scroll rows"),
                ("PgDn / PgUp", "Scroll rows by a page"),
                ("g / G", "Jump to first / last row"),
                ("Enter / l", "Open table data"),
                ("Esc", "Go back / close popup"),
                ("Tab", "Cycle focus between panels"),
                ("Shift+Tab", "Cycle focus backwards"),
            ]),
            ("Inspect", vec![
                ("d", "Toggle descriptive statistics"),
                ("n", "Toggle null check"),
                ("m", "Cycle null handling strategy"),
            ]),
            ("Analysis", vec![
                ("a", "Next sales analysis"),
                ("b", "Show BI dashboard link"),
            ]),
            ("General", vec![
                ("r", "Reload snapshots"),
                ("h / ?", "Toggle this help"),
                ("q", "Quit"),
            ]),
        ];

        let mut lines: Vec<Line> = Vec::new();

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {DESCRIPTION}"),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(""));

        for (section, items) in shortcuts {
            lines.push(Line::from(Span::styled(
                format!("  {section} "),
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::UNDERLINED),
            )));
            lines.push(Line::from(""));

            for (key, desc) in items {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(
                        format!("{key:<14}"),
                        Style::default().fg(self.theme.title),
                    ),
                    Span::raw(desc),
                ]));
            }
            lines.push(Line::from(""));
        }

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" warehouse-tui Help ")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style())
                    .title_style(self.theme.title_style())
                    .style(self.theme.surface_style()),
            )
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false })
            .style(self.theme.surface_style());

        frame.render_widget(paragraph, popup_area);
    }
}
