use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Login,
    Normal,
    Search,
    Detail,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Navigation
    MoveDown,
    MoveUp,
    JumpTop,
    JumpBottom,
    NextPage,
    PrevPage,
    CyclePageSize,

    // Search & Filters
    EnterSearch,
    ClearSearch,
    CycleStatus,
    FilterAll,
    FilterUnread,
    FilterRead,

    // Selection
    ToggleSelect,
    ToggleSelectAll,

    // Messages
    ToggleRead,
    DeleteSelected,
    OpenDetail,
    CloseDetail,
    Refresh,
    DismissError,

    // Session
    Logout,

    // Text input (login form and search)
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    NextField,

    // System
    ShowHelp,
    Quit,
    Noop,
}

impl Action {
    /// Look up an action by the name used in `[bindings]`.
    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name {
            "move_down" => Action::MoveDown,
            "move_up" => Action::MoveUp,
            "jump_top" => Action::JumpTop,
            "jump_bottom" => Action::JumpBottom,
            "next_page" => Action::NextPage,
            "prev_page" => Action::PrevPage,
            "cycle_page_size" => Action::CyclePageSize,
            "search" => Action::EnterSearch,
            "clear_search" => Action::ClearSearch,
            "cycle_status" => Action::CycleStatus,
            "filter_all" => Action::FilterAll,
            "filter_unread" => Action::FilterUnread,
            "filter_read" => Action::FilterRead,
            "toggle_select" => Action::ToggleSelect,
            "toggle_select_all" => Action::ToggleSelectAll,
            "toggle_read" => Action::ToggleRead,
            "delete_selected" => Action::DeleteSelected,
            "open" => Action::OpenDetail,
            "refresh" => Action::Refresh,
            "dismiss_error" => Action::DismissError,
            "logout" => Action::Logout,
            "help" => Action::ShowHelp,
            "quit" => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}

/// Parse a key name such as `"x"`, `"D"`, `"ctrl+r"`, `"enter"`, `"pgdn"`.
pub fn parse_key(name: &str) -> Option<(KeyCode, KeyModifiers)> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = name.trim();
    loop {
        let lower = rest.to_ascii_lowercase();
        if let Some(stripped) = lower.strip_prefix("ctrl+") {
            modifiers |= KeyModifiers::CONTROL;
            rest = &rest[rest.len() - stripped.len()..];
        } else if let Some(stripped) = lower.strip_prefix("alt+") {
            modifiers |= KeyModifiers::ALT;
            rest = &rest[rest.len() - stripped.len()..];
        } else {
            break;
        }
    }
    let code = match rest.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "pgup" => KeyCode::PageUp,
        "pgdn" => KeyCode::PageDown,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some((code, modifiers))
}

/// Shift is implied by the character itself, and terminals disagree on
/// whether they report it.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(_) => (code, modifiers - KeyModifiers::SHIFT),
        _ => (code, modifiers),
    }
}

/// Tracks multi-key sequences (g then g for JumpTop) and user overrides.
pub struct KeyMapper {
    pending: Option<KeyCode>,
    overrides: HashMap<(KeyCode, KeyModifiers), Action>,
}

impl KeyMapper {
    pub fn new() -> Self {
        Self {
            pending: None,
            overrides: HashMap::new(),
        }
    }

    /// Install `[bindings]` for normal mode. Returns entries that could not
    /// be understood.
    pub fn load_bindings(&mut self, bindings: &HashMap<String, String>) -> Vec<String> {
        let mut rejected = Vec::new();
        for (key, name) in bindings {
            match (parse_key(key), Action::from_name(name)) {
                (Some((code, mods)), Some(action)) => {
                    self.overrides.insert(normalize(code, mods), action);
                }
                _ => rejected.push(format!("{} = {:?}", key, name)),
            }
        }
        rejected.sort();
        rejected
    }

    /// Process a key event and return an action, considering current input mode.
    pub fn handle(&mut self, key: KeyEvent, mode: &InputMode) -> Action {
        match mode {
            InputMode::Normal => self.handle_normal(key),
            InputMode::Login | InputMode::Search => self.handle_input(key),
            InputMode::Detail => self.handle_detail(key),
            InputMode::Help => self.handle_help(key),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) -> Action {
        // If we have a pending first key of a sequence
        if let Some(first) = self.pending.take() {
            return self.handle_sequence(first, key);
        }

        let (code, modifiers) = normalize(key.code, key.modifiers);
        if let Some(action) = self.overrides.get(&(code, modifiers)) {
            return action.clone();
        }

        match (code, modifiers) {
            // Navigation
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::MoveUp,
            (KeyCode::Char('g'), KeyModifiers::NONE) => {
                self.pending = Some(KeyCode::Char('g'));
                Action::Noop
            }
            (KeyCode::Char('G'), KeyModifiers::NONE) => Action::JumpBottom,
            (KeyCode::Char('n'), KeyModifiers::NONE)
            | (KeyCode::Right, _)
            | (KeyCode::PageDown, _) => Action::NextPage,
            (KeyCode::Char('p'), KeyModifiers::NONE)
            | (KeyCode::Left, _)
            | (KeyCode::PageUp, _) => Action::PrevPage,
            (KeyCode::Char('+'), _) => Action::CyclePageSize,

            // Search & Filters
            (KeyCode::Char('/'), _) => Action::EnterSearch,
            (KeyCode::Char('f'), KeyModifiers::NONE) => Action::CycleStatus,
            (KeyCode::Char('A'), KeyModifiers::NONE) => Action::FilterAll,
            (KeyCode::Char('U'), KeyModifiers::NONE) => Action::FilterUnread,
            (KeyCode::Char('R'), KeyModifiers::NONE) => Action::FilterRead,

            // Selection
            (KeyCode::Char('x'), KeyModifiers::NONE) | (KeyCode::Char(' '), _) => {
                Action::ToggleSelect
            }
            (KeyCode::Char('*'), _) => Action::ToggleSelectAll,

            // Messages
            (KeyCode::Char('u'), KeyModifiers::NONE) => Action::ToggleRead,
            (KeyCode::Char('D'), KeyModifiers::NONE) | (KeyCode::Delete, _) => {
                Action::DeleteSelected
            }
            (KeyCode::Enter, _) => Action::OpenDetail,
            (KeyCode::Char('r'), KeyModifiers::CONTROL) => Action::Refresh,
            (KeyCode::Esc, _) => Action::DismissError,

            // Session
            (KeyCode::Char('L'), KeyModifiers::NONE) => Action::Logout,

            // System
            (KeyCode::Char('?'), _) => Action::ShowHelp,
            (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,

            _ => Action::Noop,
        }
    }

    fn handle_sequence(&mut self, first: KeyCode, key: KeyEvent) -> Action {
        match (first, key.code) {
            (KeyCode::Char('g'), KeyCode::Char('g')) => Action::JumpTop,
            _ => Action::Noop,
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Enter => Action::InputSubmit,
            KeyCode::Backspace => Action::InputBackspace,
            KeyCode::Tab | KeyCode::BackTab => Action::NextField,
            KeyCode::Char(c) => {
                // Allow Ctrl+C to quit even in input mode
                if c == 'c' && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Action::Quit;
                }
                if c == 'u' && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Action::ClearSearch;
                }
                Action::InputChar(c)
            }
            _ => Action::Noop,
        }
    }

    fn handle_detail(&mut self, key: KeyEvent) -> Action {
        let (code, modifiers) = normalize(key.code, key.modifiers);
        match (code, modifiers) {
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Enter, _) => {
                Action::CloseDetail
            }
            (KeyCode::Char('u'), KeyModifiers::NONE) => Action::ToggleRead,
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::MoveUp,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            _ => Action::Noop,
        }
    }

    fn handle_help(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Action::InputCancel,
            KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
            KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
            _ => Action::Noop,
        }
    }

    /// Cancel any pending sequence (e.g., on timeout).
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_display(&self) -> Option<&str> {
        match self.pending {
            Some(KeyCode::Char('g')) => Some("g"),
            _ => None,
        }
    }
}
