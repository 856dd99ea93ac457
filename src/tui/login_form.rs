use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Widget},
};

use super::help_overlay::centered_rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Email,
    Password,
}

/// Credentials being typed on the login screen.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: Field,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn push(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            Field::Email => Field::Password,
            Field::Password => Field::Email,
        };
    }

    /// Both fields are filled in.
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    /// Forget the password once it has been used, successful or not.
    pub fn reset_password(&mut self) {
        self.password.clear();
        self.focus = Field::Password;
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }
}

pub struct LoginScreen<'a> {
    pub form: &'a LoginForm,
    pub base_url: &'a str,
}

impl<'a> Widget for LoginScreen<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup = centered_rect(50, 11, area);
        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(" Admin Login ")
            .title_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        let inner = block.inner(popup);
        block.render(popup, buf);
        if inner.width < 12 || inner.height < 7 {
            return;
        }

        let label_style = Style::default().fg(Color::DarkGray);
        let field_width = inner.width.saturating_sub(12) as usize;
        let masked: String = "*".repeat(self.form.password.chars().count());

        let rows = [
            ("Email", self.form.email.as_str(), Field::Email),
            ("Password", masked.as_str(), Field::Password),
        ];
        for (i, (label, value, field)) in rows.iter().enumerate() {
            let y = inner.y + 1 + (i as u16) * 2;
            buf.set_string(inner.x + 1, y, format!("{:<9}", label), label_style);
            let focused = self.form.focus == *field;
            let style = if focused {
                Style::default().bg(Color::Indexed(236)).fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            // Keep the tail of long input visible
            let chars: Vec<char> = value.chars().collect();
            let skip = chars.len().saturating_sub(field_width.saturating_sub(1));
            let shown: String = chars[skip..].iter().collect();
            let cursor = if focused { "_" } else { "" };
            buf.set_string(
                inner.x + 11,
                y,
                format!("{:<width$}", format!("{}{}", shown, cursor), width = field_width),
                style,
            );
        }

        let footer_y = inner.y + 5;
        if let Some(error) = &self.form.error {
            let text: String = error.chars().take(inner.width as usize - 2).collect();
            buf.set_string(inner.x + 1, footer_y, text, Style::default().fg(Color::Red));
        }

        let server: String = self
            .base_url
            .chars()
            .take(inner.width as usize - 2)
            .collect();
        buf.set_string(inner.x + 1, inner.y + inner.height - 1, server, label_style);
    }
}
