//! Widgets and styling for the chat screen.

use chrono::DateTime;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use festchat_core::{ChatMessage, ChatRole};

use super::text::wrap_indented;

/// Theme configuration for the chat screen.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Primary accent color (borders, highlights).
    pub accent: Color,
    /// Muted color (timestamps, secondary info).
    pub muted: Color,
    /// User message color.
    pub user: Color,
    /// Bot message color.
    pub bot: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Blue,
            muted: Color::DarkGray,
            user: Color::Cyan,
            bot: Color::Green,
        }
    }
}

impl Theme {
    fn border(&self) -> Style {
        Style::default().fg(self.accent)
    }

    fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    fn user_style(&self) -> Style {
        Style::default().fg(self.user)
    }

    fn bot_style(&self) -> Style {
        Style::default().fg(self.bot)
    }
}

/// Conversation view: role-colored headers, wrapped content, a typing
/// indicator while a reply is streaming, auto-scrolled to the bottom.
pub struct ChatWidget<'a> {
    messages: &'a [ChatMessage],
    theme: Theme,
}

impl<'a> ChatWidget<'a> {
    pub fn new(messages: &'a [ChatMessage]) -> Self {
        Self {
            messages,
            theme: Theme::default(),
        }
    }

    pub fn render(self, frame: &mut Frame, area: Rect) {
        let visible_height = area.height.saturating_sub(2) as usize;
        let text_width = area.width.saturating_sub(2) as usize;

        let mut all_lines: Vec<Line> = Vec::new();
        for msg in self.messages {
            let (prefix, style) = match msg.role {
                ChatRole::User => ("You: ", self.theme.user_style().add_modifier(Modifier::BOLD)),
                ChatRole::Bot => ("Bot: ", self.theme.bot_style().add_modifier(Modifier::BOLD)),
            };

            let mut header = vec![
                Span::styled(prefix, style),
                Span::styled(format_timestamp(msg.timestamp_ms), self.theme.muted_style()),
            ];
            if msg.streaming {
                header.push(Span::styled("  (typing...)", self.theme.muted_style()));
            }
            all_lines.push(Line::from(header));

            for wrapped in wrap_indented(&msg.content, text_width, "  ") {
                all_lines.push(Line::from(Span::raw(wrapped)));
            }
            all_lines.push(Line::from(""));
        }

        // Follow the newest content.
        let scroll_offset = all_lines.len().saturating_sub(visible_height);
        let lines: Vec<Line> = all_lines
            .into_iter()
            .skip(scroll_offset)
            .take(visible_height)
            .collect();

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.border())
                .title(" FestFlex Assistant "),
        );
        frame.render_widget(paragraph, area);
    }
}

/// Draw the whole chat screen: message list on top, input line below.
pub fn draw(frame: &mut Frame, input: &str, messages: &[ChatMessage]) {
    let theme = Theme::default();
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(frame.area());

    ChatWidget::new(messages).render(frame, chat_area);

    let input_box = Paragraph::new(input).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.muted_style())
            .title(" Message (Enter send, Ctrl+L clear, Esc quit) "),
    );
    frame.render_widget(input_box, input_area);
    frame.set_cursor_position(Position::new(
        input_area.x + 1 + input.width() as u16,
        input_area.y + 1,
    ));
}

fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
