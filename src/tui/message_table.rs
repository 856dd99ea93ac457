use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::inbox::{MessageInbox, Phase};
use crate::message::Message;

/// Characters of the body shown in the table before "...".
pub const PREVIEW_CHARS: usize = 50;

const CHECK_WIDTH: usize = 4;
const NAME_WIDTH: usize = 18;
const EMAIL_WIDTH: usize = 26;
const DATE_WIDTH: usize = 10;
const STATUS_WIDTH: usize = 6;

pub struct MessageTable<'a> {
    pub rows: &'a [&'a Message],
    pub inbox: &'a MessageInbox,
    pub cursor: usize,
    pub offset: usize,
}

impl<'a> MessageTable<'a> {
    /// Calculate the visible range for scrolling.
    pub fn visible_range(
        cursor: usize,
        offset: usize,
        height: usize,
        total: usize,
    ) -> (usize, usize) {
        let mut off = offset;
        if cursor < off {
            off = cursor;
        }
        if height > 0 && cursor >= off + height {
            off = cursor - height + 1;
        }
        let end = (off + height).min(total);
        (off, end)
    }
}

impl<'a> Widget for MessageTable<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Header row
        let header_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let all = if self.inbox.all_filtered_selected() {
            "[x]"
        } else {
            "[ ]"
        };
        let header = layout_row(
            area.width as usize,
            all,
            "Name",
            "Email",
            "Message",
            "Date",
            "Status",
        );
        buf.set_string(area.x, area.y, &header, header_style);

        let body = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
        if self.rows.is_empty() {
            let style = Style::default().fg(Color::DarkGray);
            let text = if matches!(self.inbox.phase(), Phase::Uninitialized | Phase::Loading) {
                "Loading messages..."
            } else if self.inbox.messages().is_empty() {
                "No messages"
            } else {
                "No messages match the current filter"
            };
            buf.set_string(body.x + 2, body.y + body.height / 2, text, style);
            return;
        }

        let height = body.height as usize;
        let (start, end) = Self::visible_range(self.cursor, self.offset, height, self.rows.len());

        for (i, message) in self.rows[start..end].iter().enumerate() {
            let y = body.y + i as u16;
            let is_cursor = start + i == self.cursor;
            let is_checked = self.inbox.is_selected(&message.id);

            let base_style = if is_cursor {
                Style::default().bg(Color::Indexed(236)).fg(Color::White)
            } else {
                Style::default()
            };
            buf.set_style(Rect::new(body.x, y, body.width, 1), base_style);

            let row_style = if !message.read {
                base_style.add_modifier(Modifier::BOLD)
            } else {
                base_style.fg(Color::Gray)
            };
            let check = if is_checked { "[x]" } else { "[ ]" };
            let line = layout_row(
                body.width as usize,
                check,
                &message.name,
                &message.email,
                &message.preview(PREVIEW_CHARS),
                &message.date_display(),
                message.status_label(),
            );
            buf.set_string(body.x, y, &line, row_style);

            if is_checked {
                buf.set_string(
                    body.x,
                    y,
                    check,
                    base_style.fg(Color::Green).add_modifier(Modifier::BOLD),
                );
            }
            if !message.read {
                let status_x = body.x + body.width.saturating_sub(STATUS_WIDTH as u16);
                buf.set_string(
                    status_x,
                    y,
                    pad(message.status_label(), STATUS_WIDTH),
                    base_style.fg(Color::Cyan).add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}

/// Fixed columns left and right, the message preview takes what is left.
fn layout_row(
    width: usize,
    check: &str,
    name: &str,
    email: &str,
    preview: &str,
    date: &str,
    status: &str,
) -> String {
    let fixed = CHECK_WIDTH + NAME_WIDTH + 1 + EMAIL_WIDTH + 1 + DATE_WIDTH + 1 + STATUS_WIDTH;
    let preview_width = width.saturating_sub(fixed + 1);
    let mut row = String::new();
    row.push_str(&pad(check, CHECK_WIDTH));
    row.push_str(&pad(name, NAME_WIDTH));
    row.push(' ');
    row.push_str(&pad(email, EMAIL_WIDTH));
    row.push(' ');
    if preview_width > 0 {
        row.push_str(&pad(preview, preview_width));
        row.push(' ');
    }
    row.push_str(&pad(date, DATE_WIDTH));
    row.push(' ');
    row.push_str(&pad(status, STATUS_WIDTH));
    truncate_str(&row, width)
}

/// Truncate then right-pad with spaces to exactly `width` columns.
fn pad(s: &str, width: usize) -> String {
    let mut out = truncate_str(s, width);
    let used = UnicodeWidthStr::width(out.as_str());
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

/// Truncate a string to fit within `max_width` columns, marking the cut with "~".
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        used += w;
        result.push(c);
    }
    result.push('~');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_columns() {
        assert_eq!(truncate_str("Ada", 5), "Ada");
        assert_eq!(truncate_str("Lovelace", 5), "Love~");
        assert_eq!(truncate_str("日本語テキスト", 5), "日本~");
        assert_eq!(truncate_str("anything", 0), "");
    }

    #[test]
    fn pad_fills_to_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abc~");
    }

    #[test]
    fn row_never_exceeds_width() {
        let row = layout_row(60, "[ ]", "Ada", "ada@example.com", "hello", "2026-03-01", "Unread");
        assert!(UnicodeWidthStr::width(row.as_str()) <= 60);
        assert!(row.starts_with("[ ] Ada"));
    }

    #[test]
    fn visible_range_follows_cursor() {
        assert_eq!(MessageTable::visible_range(0, 0, 5, 10), (0, 5));
        assert_eq!(MessageTable::visible_range(7, 0, 5, 10), (3, 8));
        assert_eq!(MessageTable::visible_range(1, 3, 5, 10), (1, 6));
    }
}
