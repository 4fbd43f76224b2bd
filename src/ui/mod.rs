//! Terminal User Interface components for warehouse-tui.

pub mod chart;
mod help;
pub mod inspect;
pub mod table_view;
mod theme;
pub mod widgets;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub use help::HelpOverlay;
pub use theme::Theme;

/// Create a centered rect for popup dialogs
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert!(popup.x >= area.x && popup.y >= area.y);
        assert!(popup.right() <= area.right() && popup.bottom() <= area.bottom());
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
    }
}
