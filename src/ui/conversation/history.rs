//! Chat transcript and its scrolling view

use crate::events::{Author, ChatEntry, EntryKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Append-only chat transcript
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
    /// Lines scrolled up from the bottom; 0 pins the view to the newest entry
    scroll_offset: usize,
    show_timestamps: bool,
}

impl Transcript {
    pub fn new(show_timestamps: bool) -> Self {
        Self {
            entries: Vec::new(),
            scroll_offset: 0,
            show_timestamps,
        }
    }

    /// Append an entry and scroll so it is visible
    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
        self.scroll_to_bottom();
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.push(ChatEntry::message(Author::User, text));
    }

    pub fn add_system_message(&mut self, text: impl Into<String>) {
        self.push(ChatEntry::message(Author::System, text));
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// All transcript lines wrapped to `width`
    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for entry in &self.entries {
            all_lines.extend(self.render_entry(entry, width));
            all_lines.push(Line::from(""));
        }
        all_lines
    }

    fn render_entry(&self, entry: &ChatEntry, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if entry.kind == EntryKind::Message {
            let mut header = format!("{} ", role_label(entry.author));
            if self.show_timestamps {
                header.push_str(&entry.timestamp.format("%H:%M:%S").to_string());
            }
            lines.push(Line::from(vec![Span::styled(
                header,
                Style::default().fg(Color::DarkGray),
            )]));
        }

        let style = content_style(entry);
        for content_line in wrap_text(&entry.text, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, style),
            ]));
        }

        lines
    }
}

fn role_label(author: Author) -> &'static str {
    match author {
        Author::User => "you",
        Author::Assistant => "assistant",
        Author::System => "ragchat",
    }
}

fn content_style(entry: &ChatEntry) -> Style {
    match (entry.kind, entry.author) {
        (EntryKind::Sources, _) => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        (_, Author::User) => Style::default().fg(Color::Blue),
        (_, Author::Assistant) => Style::default().fg(Color::Green),
        (_, Author::System) => Style::default().fg(Color::Yellow),
    }
}

/// Greedy word wrap. Explicit newlines in the text are kept; a word wider
/// than `width` is split across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if word_width > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        lines.push(chunk.iter().collect());
                    } else {
                        current_line = chunk.iter().collect();
                        current_width = chunk.len();
                    }
                }
                continue;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }

        lines.push(current_line);
    }

    lines
}

impl Widget for &Transcript {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() {
            let welcome_lines = [
                Line::from(vec![Span::styled(
                    "Ask a question about your documents.",
                    Style::default().fg(Color::Green),
                )]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Enter sends, Tab edits the endpoint, /help lists commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let offset = self.scroll_offset.min(max_offset);
        let start = max_offset - offset;
        let visible = all_lines.iter().skip(start).take(height);

        for (i, line) in visible.enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
