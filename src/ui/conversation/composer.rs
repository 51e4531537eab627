//! Single-line text input used for both the query and the endpoint field

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result of feeding a key to the input
#[derive(Debug, PartialEq, Eq)]
pub enum InputResult {
    /// Enter was pressed; carries the raw (untrimmed) contents
    Submitted(String),
    None,
}

/// Editable line of text with a character-indexed cursor
#[derive(Debug, Clone)]
pub struct TextInput {
    content: String,
    cursor: usize,
    title: String,
    placeholder: String,
    has_focus: bool,
    disabled: bool,
}

impl TextInput {
    pub fn new(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            title: title.into(),
            placeholder: placeholder.into(),
            has_focus: false,
            disabled: false,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
        if key.kind != KeyEventKind::Press {
            return InputResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                // A disabled input swallows submits but stays editable
                if !self.disabled {
                    return InputResult::Submitted(self.content.clone());
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        InputResult::None
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    pub fn value(&self) -> &str {
        &self.content
    }

    /// Replace the contents and move the cursor to the end
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.content = value.into();
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.disabled {
            Style::default().fg(Color::DarkGray)
        } else if self.has_focus {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }

        let line = if self.content.is_empty() && !self.has_focus {
            Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            let mut content = self.content.clone();
            if self.has_focus {
                content.insert(self.byte_index(self.cursor), '▌');
            }
            // Keep the cursor visible on long input
            let width = inner_area.width as usize;
            let skip = (self.cursor + 1).saturating_sub(width);
            let visible: String = content.chars().skip(skip).collect();
            Line::from(vec![Span::raw(visible)])
        };

        buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
    }
}
