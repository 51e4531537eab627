use crate::events::BusyState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line status bar: busy indicator on the left, endpoint on the right
#[derive(Debug, Clone)]
pub struct StatusLine<'a> {
    pub busy: BusyState,
    pub endpoint: &'a str,
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        if self.busy.is_busy() {
            let dots = match (std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
                / 300)
                % 4
            {
                0 => ".",
                1 => "..",
                2 => "...",
                _ => "   ",
            };

            let indicator = Line::from(vec![
                Span::styled("Waiting for answer", Style::default().fg(Color::Green)),
                Span::styled(dots, Style::default().fg(Color::Yellow)),
            ]);
            buf.set_line(area.x, area.y, &indicator, area.width);
        }

        let endpoint = format!("→ {}", self.endpoint);
        let endpoint_width = endpoint.chars().count() as u16;
        if endpoint_width < area.width {
            let line = Line::from(vec![Span::styled(
                endpoint,
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(
                area.x + area.width - endpoint_width,
                area.y,
                &line,
                endpoint_width,
            );
        }
    }
}
