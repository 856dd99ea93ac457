use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::keymap::InputMode;
use crate::summary::SummaryPanel;

use super::message_table::truncate_str;

pub struct TopBar<'a> {
    /// None before the console is mounted.
    pub summary: Option<&'a SummaryPanel>,
    pub base_url: &'a str,
}

impl<'a> Widget for TopBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        let left = " safedesk ";
        let counters = match self.summary {
            None => String::new(),
            Some(panel) if panel.is_loading() => " loading... ".to_string(),
            Some(panel) => {
                let s = panel.summary();
                format!(
                    " {} total | {} unread | latest: {} ",
                    s.total_messages,
                    s.unread_messages,
                    s.latest_display()
                )
            }
        };

        let left_spans = Line::from(vec![
            Span::styled(
                left,
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(counters.clone(), style),
        ]);
        buf.set_line(area.x, area.y, &left_spans, area.width);

        // Server on the right when there is room for it
        let right = format!(" {} ", self.base_url);
        let used = (left.len() + UnicodeWidthStr::width(counters.as_str())) as u16;
        let right_len = UnicodeWidthStr::width(right.as_str()) as u16;
        if area.width > right_len + used {
            let rx = area.x + area.width - right_len;
            buf.set_string(rx, area.y, &right, style.fg(Color::Gray));
        }
    }
}

pub struct BottomBar<'a> {
    pub mode: &'a InputMode,
    pub pending_key: Option<&'a str>,
    pub search_input: Option<&'a str>,
    pub filter_desc: &'a str,
    pub page: (usize, usize),
    pub selection_count: usize,
    pub status_message: Option<&'a str>,
    pub error: Option<&'a str>,
    pub confirming: Option<usize>,
}

impl<'a> BottomBar<'a> {
    fn hints(&self) -> &'static str {
        match self.mode {
            InputMode::Login => "Tab:next field  Enter:sign in  Esc:quit",
            InputMode::Search => "Enter:done  Ctrl+u:clear  Esc:cancel",
            InputMode::Detail => "u:toggle read  q/Esc:close",
            InputMode::Help => "j/k:scroll  q/Esc:close",
            InputMode::Normal => "x:select  u:read  D:delete  /:search  f:filter  ?:help",
        }
    }
}

impl<'a> Widget for BottomBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        if let Some(count) = self.confirming {
            let prompt = format!(" Delete {} message(s)? (y/n) ", count);
            buf.set_string(
                area.x,
                area.y,
                &prompt,
                Style::default()
                    .bg(Color::Red)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
            return;
        }

        if let Some(error) = self.error {
            let text = format!(" {}  (Esc to dismiss) ", error);
            buf.set_string(
                area.x,
                area.y,
                truncate_str(&text, area.width as usize),
                Style::default().bg(Color::Red).fg(Color::White),
            );
            return;
        }

        let mut parts = Vec::new();
        if let Some(pending) = self.pending_key {
            parts.push(format!("{}...", pending));
        }
        if let Some(input) = self.search_input {
            parts.push(format!("/{}_", input));
        }
        if *self.mode != InputMode::Login {
            parts.push(format!("[{}]", self.filter_desc));
            let (page, count) = self.page;
            parts.push(format!("page {}/{}", page + 1, count.max(1)));
            if self.selection_count > 0 {
                parts.push(format!("{} selected", self.selection_count));
            }
        }
        if let Some(status) = self.status_message {
            parts.push(status.to_string());
        }
        let left = format!(" {}", parts.join(" | "));
        buf.set_string(
            area.x,
            area.y,
            truncate_str(&left, area.width as usize),
            style,
        );

        let hints = format!("{} ", self.hints());
        let used = UnicodeWidthStr::width(left.as_str()) as u16;
        let hints_len = UnicodeWidthStr::width(hints.as_str()) as u16;
        if area.width > hints_len + used + 1 {
            let hx = area.x + area.width - hints_len;
            buf.set_string(hx, area.y, &hints, style.fg(Color::Gray));
        }
    }
}
