use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use super::help_overlay::centered_rect;
use crate::message::Message;

/// Modal showing one message in full.
pub struct DetailModal<'a> {
    pub message: &'a Message,
}

impl<'a> Widget for DetailModal<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(8).clamp(20, 90);
        let height = area.height.saturating_sub(4).clamp(8, 30);
        let popup = centered_rect(width, height, area);
        Clear.render(popup, buf);

        let message = self.message;
        let header_style = Style::default().fg(Color::DarkGray);
        let value_style = Style::default().fg(Color::White);
        let subject_style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::from(vec![
                Span::styled("From:    ", header_style),
                Span::styled(message.name.as_str(), value_style),
            ]),
            Line::from(vec![
                Span::styled("Email:   ", header_style),
                Span::styled(message.email.as_str(), value_style),
            ]),
        ];
        if let Some(phone) = message.phone.as_deref().filter(|p| !p.is_empty()) {
            lines.push(Line::from(vec![
                Span::styled("Phone:   ", header_style),
                Span::styled(phone, value_style),
            ]));
        }
        if let Some(subject) = message.subject.as_deref().filter(|s| !s.is_empty()) {
            lines.push(Line::from(vec![
                Span::styled("Subject: ", header_style),
                Span::styled(subject, subject_style),
            ]));
        }
        lines.push(Line::from(vec![
            Span::styled("Status:  ", header_style),
            Span::styled(message.status_label(), value_style),
        ]));
        lines.push(Line::from(""));

        for line in message.message.lines() {
            lines.push(Line::from(Span::styled(line, value_style)));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Sent on {}", message.timestamp_display()),
            header_style,
        )));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(" Message ")
            .title_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .title_bottom(Line::from(" u:toggle read  q/Esc:close ").style(header_style));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(popup, buf);
    }
}
