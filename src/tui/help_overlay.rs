use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Widget},
};

struct HelpSection {
    title: &'static str,
    keys: &'static [(&'static str, &'static str)],
}

const SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "Navigation",
        keys: &[
            ("j / Down", "Move down"),
            ("k / Up", "Move up"),
            ("gg", "Jump to first message"),
            ("G", "Jump to last message"),
            ("n / Right", "Next page"),
            ("p / Left", "Previous page"),
            ("+", "Cycle page size"),
        ],
    },
    HelpSection {
        title: "Search & Filters",
        keys: &[
            ("/", "Search name, email, message"),
            ("Ctrl+u", "Clear search (while typing)"),
            ("f", "Cycle All / Unread / Read"),
            ("A", "Show all"),
            ("U", "Show unread"),
            ("R", "Show read"),
        ],
    },
    HelpSection {
        title: "Selection",
        keys: &[
            ("x / Space", "Toggle select"),
            ("*", "Select all filtered"),
        ],
    },
    HelpSection {
        title: "Messages",
        keys: &[
            ("Enter", "Open message"),
            ("u", "Toggle read/unread"),
            ("D", "Delete selected"),
            ("Ctrl+r", "Refresh"),
            ("Esc", "Dismiss error"),
        ],
    },
    HelpSection {
        title: "Other",
        keys: &[
            ("L", "Log out"),
            ("?", "This help"),
            ("q", "Quit"),
        ],
    },
];

/// Rect of the given size centred in `area`, clipped to it.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(x, y, w, h)
}

enum HelpLine {
    Blank,
    Title(&'static str),
    Binding(&'static str, &'static str),
    Footer(&'static str),
}

fn help_lines() -> Vec<HelpLine> {
    let mut lines = Vec::new();
    for (si, section) in SECTIONS.iter().enumerate() {
        if si > 0 {
            lines.push(HelpLine::Blank);
        }
        lines.push(HelpLine::Title(section.title));
        lines.extend(section.keys.iter().map(|&(k, d)| HelpLine::Binding(k, d)));
    }
    lines.push(HelpLine::Blank);
    lines.push(HelpLine::Footer(" j/k:scroll  ?/q/Esc:close"));
    lines
}

/// Longest scroll offset that still fills a viewport of `height` rows.
pub fn max_scroll(height: u16) -> u16 {
    help_lines().len().saturating_sub(height as usize) as u16
}

pub struct HelpOverlay {
    pub scroll: u16,
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_height: u16 = area.height.clamp(10, 30);
        let popup = centered_rect(52, popup_height, area);

        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Keyboard Shortcuts ")
            .title_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        let inner = block.inner(popup);
        block.render(popup, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let key_col_width: u16 = 14;
        let title_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let key_style = Style::default().fg(Color::Cyan);
        let desc_style = Style::default().fg(Color::White);
        let footer_style = Style::default().fg(Color::DarkGray);

        let lines = help_lines();
        let scroll = self.scroll.min(max_scroll(inner.height)) as usize;

        for (i, line) in lines.iter().skip(scroll).take(inner.height as usize).enumerate() {
            let y = inner.y + i as u16;
            match line {
                HelpLine::Blank => {}
                HelpLine::Title(title) => {
                    buf.set_string(inner.x + 1, y, title, title_style);
                }
                HelpLine::Binding(key, desc) => {
                    buf.set_string(inner.x + 2, y, key, key_style);
                    buf.set_string(inner.x + 2 + key_col_width, y, desc, desc_style);
                }
                HelpLine::Footer(text) => {
                    buf.set_string(inner.x, y, text, footer_style);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_clipped() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(80, 40, area), Rect::new(0, 0, 40, 10));
    }

    #[test]
    fn scrolling_stops_at_the_last_line() {
        let total = help_lines().len() as u16;
        assert_eq!(max_scroll(total), 0);
        assert_eq!(max_scroll(total - 3), 3);
    }
}
