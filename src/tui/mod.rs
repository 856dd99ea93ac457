pub mod detail;
pub mod help_overlay;
pub mod login_form;
pub mod message_table;
pub mod status_bar;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::access::{Gate, Route};
use crate::api::{AdminApi, ApiError};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::fetch::Outcome;
use crate::inbox::MessageInbox;
use crate::keymap::{Action, InputMode, KeyMapper};
use crate::message::{Message, StatusFilter};

use self::detail::DetailModal;
use self::help_overlay::HelpOverlay;
use self::login_form::{Field, LoginForm, LoginScreen};
use self::message_table::MessageTable;
use self::status_bar::{BottomBar, TopBar};

pub struct App {
    pub dashboard: Dashboard,
    api: Arc<dyn AdminApi>,
    pub keymap: KeyMapper,
    pub should_quit: bool,

    // Mode
    pub mode: InputMode,

    // Cursor within the visible page
    pub cursor: usize,
    pub scroll_offset: usize,

    // Search
    pub search_input: String,

    // Login screen
    pub login: LoginForm,

    // Help overlay
    pub help_scroll: u16,

    // Waiting for y/n before a bulk delete
    pub confirm_delete: bool,

    // Status message (temporary feedback)
    pub status_message: Option<String>,
    pub status_time: Option<Instant>,

    // Config
    pub config: Config,
}

impl App {
    pub fn new(config: Config, api: Arc<dyn AdminApi>, gate: Gate) -> Self {
        let mut keymap = KeyMapper::new();
        for rejected in keymap.load_bindings(&config.bindings) {
            warn!(binding = %rejected, "ignoring unknown key binding");
        }
        let inbox = MessageInbox::new(config.inbox.page_sizes.clone(), config.inbox.page_size);
        debug!(
            base_url = %config.api.base_url,
            page_size = inbox.page_size(),
            "console configured"
        );

        Self {
            dashboard: Dashboard::new(api.clone(), gate, inbox),
            api,
            keymap,
            should_quit: false,
            mode: InputMode::Login,
            cursor: 0,
            scroll_offset: 0,
            search_input: String::new(),
            login: LoginForm::default(),
            help_scroll: 0,
            confirm_delete: false,
            status_message: None,
            status_time: None,
            config,
        }
    }

    /// Bring the screen in line with the router. Entering the console
    /// mounts the dashboard; being sent to login unmounts it.
    pub async fn sync_route(&mut self) {
        match self.dashboard.gate().router().current() {
            Route::Login => {
                if self.mode != InputMode::Login {
                    let evicted = self.dashboard.is_mounted();
                    self.dashboard.unmount();
                    self.enter_login();
                    if evicted {
                        self.login.error = Some("Session expired, please sign in again".into());
                    }
                }
            }
            Route::Console => {
                if !self.dashboard.is_mounted() {
                    if self.dashboard.mount().await {
                        self.mode = InputMode::Normal;
                        self.cursor = 0;
                        self.scroll_offset = 0;
                    } else {
                        self.enter_login();
                    }
                }
            }
        }
        if self.mode == InputMode::Detail && self.dashboard.inbox.detail().is_none() {
            self.mode = InputMode::Normal;
        }
        self.clamp_cursor();
    }

    fn enter_login(&mut self) {
        self.mode = InputMode::Login;
        self.confirm_delete = false;
        self.search_input.clear();
        self.login.reset_password();
        if self.login.email.is_empty() {
            self.login.focus = Field::Email;
        }
    }

    async fn submit_login(&mut self) {
        if !self.login.is_complete() {
            if self.login.focus == Field::Email && !self.login.email.trim().is_empty() {
                self.login.next_field();
            } else {
                self.login.error = Some("Email and password are required".into());
            }
            return;
        }
        self.login.error = None;
        let email = self.login.email.trim().to_string();
        let result = self.api.login(&email, &self.login.password).await;
        self.login.reset_password();
        match result {
            Ok(credential) => {
                info!(email = %email, "operator signed in");
                let gate = self.dashboard.gate();
                gate.session().set(credential);
                gate.router().navigate(Route::Console);
                self.sync_route().await;
            }
            Err(ApiError::LoginRejected(reason)) => {
                info!(email = %email, "login rejected");
                self.login.error = Some(if reason.trim().is_empty() {
                    "Invalid credentials".to_string()
                } else {
                    reason
                });
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.login.error = Some(format!("Login failed: {}", e));
            }
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_time = Some(Instant::now());
    }

    fn clear_stale_status(&mut self) {
        if let Some(t) = self.status_time {
            if t.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }

    fn filter_description(&self) -> String {
        let inbox = &self.dashboard.inbox;
        let label = inbox.status_filter().label();
        if inbox.search_text().is_empty() || self.mode == InputMode::Search {
            label.to_string()
        } else {
            format!("{} \"{}\"", label, inbox.search_text())
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────

    fn current_message(&self) -> Option<Message> {
        self.dashboard
            .inbox
            .visible()
            .get(self.cursor)
            .map(|m| (*m).clone())
    }

    fn clamp_cursor(&mut self) {
        let len = self.dashboard.inbox.visible().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    /// Past the end of a page continues on the next one.
    fn move_down(&mut self) {
        let inbox = &mut self.dashboard.inbox;
        if self.cursor + 1 < inbox.visible().len() {
            self.cursor += 1;
        } else if inbox.page() + 1 < inbox.page_count() {
            inbox.next_page();
            self.cursor = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.dashboard.inbox.page() > 0 {
            self.dashboard.inbox.prev_page();
            self.cursor = usize::MAX;
            self.clamp_cursor();
        }
    }

    /// In the detail modal, j/k walk through the page.
    fn follow_cursor_in_detail(&mut self) {
        if self.mode == InputMode::Detail {
            if let Some(message) = self.current_message() {
                self.dashboard.inbox.open_detail(message);
            }
        }
    }

    // ── Filters ─────────────────────────────────────────────────────

    fn set_filter(&mut self, filter: StatusFilter) {
        self.dashboard.inbox.set_status_filter(filter);
        self.cursor = 0;
        self.set_status(format!("Showing {}", filter.label()));
    }

    fn update_search(&mut self) {
        self.dashboard.inbox.set_search_text(self.search_input.clone());
        self.cursor = 0;
    }

    // ── Mutations ───────────────────────────────────────────────────

    async fn toggle_read(&mut self) {
        let target = if self.mode == InputMode::Detail {
            self.dashboard.inbox.detail().cloned()
        } else {
            self.current_message()
        };
        let Some(message) = target else {
            return;
        };
        if self.dashboard.toggle_read(&message).await == Outcome::Applied {
            self.set_status(if message.read {
                "Marked as unread"
            } else {
                "Marked as read"
            });
        }
    }

    fn request_delete(&mut self) {
        if self.dashboard.inbox.selected().is_empty() {
            self.set_status("Nothing selected");
        } else {
            self.confirm_delete = true;
        }
    }

    /// Answer to the delete prompt; anything but y cancels.
    async fn answer_confirm(&mut self, key: KeyEvent) {
        self.confirm_delete = false;
        if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            self.set_status("Delete cancelled");
            return;
        }
        let count = self.dashboard.inbox.selected().len();
        if self.dashboard.delete_selected().await == Outcome::Applied {
            self.set_status(format!("Deleted {} message(s)", count));
        }
    }

    // ── Action dispatch ─────────────────────────────────────────────

    async fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            // Navigation
            Action::MoveDown => match self.mode {
                InputMode::Help => self.help_scroll = self.help_scroll.saturating_add(1),
                _ => {
                    self.move_down();
                    self.follow_cursor_in_detail();
                }
            },
            Action::MoveUp => match self.mode {
                InputMode::Help => self.help_scroll = self.help_scroll.saturating_sub(1),
                _ => {
                    self.move_up();
                    self.follow_cursor_in_detail();
                }
            },
            Action::JumpTop => {
                self.dashboard.inbox.set_page(0);
                self.cursor = 0;
            }
            Action::JumpBottom => {
                let last = self.dashboard.inbox.page_count() - 1;
                self.dashboard.inbox.set_page(last);
                self.cursor = usize::MAX;
            }
            Action::NextPage => {
                self.dashboard.inbox.next_page();
                self.cursor = 0;
            }
            Action::PrevPage => {
                self.dashboard.inbox.prev_page();
                self.cursor = 0;
            }
            Action::CyclePageSize => {
                if let Err(e) = self.dashboard.inbox.cycle_page_size() {
                    warn!("{}", e);
                }
                self.cursor = 0;
                let size = self.dashboard.inbox.page_size();
                self.set_status(format!("{} per page", size));
            }

            // Search & Filters
            Action::EnterSearch => {
                self.search_input = self.dashboard.inbox.search_text().to_string();
                self.mode = InputMode::Search;
            }
            Action::ClearSearch => {
                self.search_input.clear();
                self.update_search();
            }
            Action::CycleStatus => {
                let next = self.dashboard.inbox.status_filter().cycle();
                self.set_filter(next);
            }
            Action::FilterAll => self.set_filter(StatusFilter::All),
            Action::FilterUnread => self.set_filter(StatusFilter::Unread),
            Action::FilterRead => self.set_filter(StatusFilter::Read),

            // Selection
            Action::ToggleSelect => {
                if let Some(message) = self.current_message() {
                    self.dashboard.inbox.toggle_select(&message.id);
                }
            }
            Action::ToggleSelectAll => {
                let checked = !self.dashboard.inbox.all_filtered_selected();
                self.dashboard.inbox.toggle_select_all(checked);
            }

            // Messages
            Action::ToggleRead => self.toggle_read().await,
            Action::DeleteSelected => self.request_delete(),
            Action::OpenDetail => {
                if let Some(message) = self.current_message() {
                    self.dashboard.inbox.open_detail(message);
                    self.mode = InputMode::Detail;
                }
            }
            Action::CloseDetail => {
                self.dashboard.inbox.close_detail();
                self.mode = InputMode::Normal;
            }
            Action::Refresh => {
                let (summary, messages) = self.dashboard.refresh().await;
                debug!(?summary, ?messages, "manual refresh");
                if summary == Outcome::Applied && messages == Outcome::Applied {
                    self.set_status("Refreshed");
                }
            }
            Action::DismissError => {
                self.dashboard.dismiss_errors();
                self.status_message = None;
            }

            // Session
            Action::Logout => {
                self.dashboard.logout();
                self.enter_login();
                self.set_status("Logged out");
            }

            // Text input
            Action::InputChar(c) => match self.mode {
                InputMode::Login => self.login.push(c),
                InputMode::Search => {
                    self.search_input.push(c);
                    self.update_search();
                }
                _ => {}
            },
            Action::InputBackspace => match self.mode {
                InputMode::Login => self.login.backspace(),
                InputMode::Search => {
                    self.search_input.pop();
                    self.update_search();
                }
                _ => {}
            },
            Action::InputSubmit => match self.mode {
                InputMode::Login => self.submit_login().await,
                InputMode::Search => self.mode = InputMode::Normal,
                _ => {}
            },
            Action::InputCancel => match self.mode {
                InputMode::Login => self.should_quit = true,
                InputMode::Search => {
                    self.search_input.clear();
                    self.update_search();
                    self.mode = InputMode::Normal;
                }
                InputMode::Help => self.mode = InputMode::Normal,
                _ => {}
            },
            Action::NextField => {
                if self.mode == InputMode::Login {
                    self.login.next_field();
                }
            }

            // System
            Action::ShowHelp => {
                self.help_scroll = 0;
                self.mode = InputMode::Help;
            }
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
        self.clamp_cursor();
        Ok(())
    }

    // ── Drawing ─────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.area();
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(size);

        let base_url = self.config.api.base_url.as_str();
        let top = TopBar {
            summary: self
                .dashboard
                .is_mounted()
                .then_some(&self.dashboard.summary),
            base_url,
        };
        frame.render_widget(top, outer[0]);

        if self.mode == InputMode::Login {
            let screen = LoginScreen {
                form: &self.login,
                base_url,
            };
            frame.render_widget(screen, outer[1]);
        } else {
            let rows = self.dashboard.inbox.visible();
            let height = outer[1].height.saturating_sub(1) as usize;
            let (offset, _) =
                MessageTable::visible_range(self.cursor, self.scroll_offset, height, rows.len());
            let table = MessageTable {
                rows: &rows,
                inbox: &self.dashboard.inbox,
                cursor: self.cursor,
                offset,
            };
            frame.render_widget(table, outer[1]);
            self.scroll_offset = offset;
        }

        // Bottom bar
        let inbox = &self.dashboard.inbox;
        let filter_desc = self.filter_description();
        let errors = self.dashboard.errors().join(" / ");
        let bottom = BottomBar {
            mode: &self.mode,
            pending_key: self.keymap.pending_display(),
            search_input: (self.mode == InputMode::Search).then_some(self.search_input.as_str()),
            filter_desc: &filter_desc,
            page: (inbox.page(), inbox.page_count()),
            selection_count: inbox.selected().len(),
            status_message: self.status_message.as_deref(),
            error: (self.mode != InputMode::Login && !errors.is_empty())
                .then_some(errors.as_str()),
            confirming: self.confirm_delete.then(|| inbox.selected().len()),
        };
        frame.render_widget(bottom, outer[2]);

        // Popup overlays
        if self.mode == InputMode::Detail {
            if let Some(message) = inbox.detail() {
                frame.render_widget(DetailModal { message }, size);
            }
        }
        if self.mode == InputMode::Help {
            let rows = size.height.clamp(10, 30).min(size.height).saturating_sub(2);
            self.help_scroll = self.help_scroll.min(help_overlay::max_scroll(rows));
            frame.render_widget(
                HelpOverlay {
                    scroll: self.help_scroll,
                },
                size,
            );
        }
    }
}

pub async fn run(mut app: App) -> Result<()> {
    // The guard decides whether a stored credential lets us straight in.
    app.dashboard.gate().router().navigate(Route::Console);

    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut app, &mut terminal).await;

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    app.dashboard.unmount();
    result
}

async fn event_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    let sequence_timeout = Duration::from_millis(1000);
    let mut last_key_time = Instant::now();
    let mut event_stream = EventStream::new();

    loop {
        app.sync_route().await;
        app.clear_stale_status();

        terminal.draw(|frame| app.draw(frame))?;

        if app.should_quit {
            break;
        }

        // Handle key sequence timeout
        if app.keymap.has_pending() && last_key_time.elapsed() > sequence_timeout {
            app.keymap.cancel_pending();
        }

        let timeout = if app.keymap.has_pending() {
            sequence_timeout
        } else {
            Duration::from_millis(250)
        };

        let event = tokio::select! {
            ev = event_stream.next() => ev.and_then(|r| r.ok()),
            _ = tokio::time::sleep(timeout) => None,
        };

        if let Some(Event::Key(key)) = event {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            last_key_time = Instant::now();

            if app.confirm_delete {
                app.answer_confirm(key).await;
                continue;
            }

            let action = app.keymap.handle(key, &app.mode);
            if let Err(e) = app.handle_action(action).await {
                app.set_status(format!("Error: {}", e));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Router;
    use crate::api::stub::{Endpoint, StubApi};
    use crate::message::{make_message, MessageId};
    use crate::session::{Credential, Session};
    use crossterm::event::KeyModifiers;

    fn scenario() -> Vec<Message> {
        vec![
            make_message(1, "Ada", "first", false),
            make_message(2, "Bob", "second", true),
            make_message(3, "Cleo", "third", false),
        ]
    }

    fn app_with(api: &Arc<StubApi>, session: Session) -> App {
        let api: Arc<dyn AdminApi> = api.clone();
        App::new(Config::default(), api, Gate::new(session, Router::default()))
    }

    async fn start(app: &mut App) {
        app.dashboard.gate().router().navigate(Route::Console);
        app.sync_route().await;
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_action(Action::InputChar(c)).await.unwrap();
        }
    }

    async fn sign_in(app: &mut App, password: &str) {
        type_text(app, "admin@example.com").await;
        app.handle_action(Action::NextField).await.unwrap();
        type_text(app, password).await;
        app.handle_action(Action::InputSubmit).await.unwrap();
    }

    #[tokio::test]
    async fn starts_on_login_without_credential() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let mut app = app_with(&api, Session::in_memory());
        start(&mut app).await;
        assert_eq!(app.mode, InputMode::Login);
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn stored_credential_goes_straight_to_console() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let session = Session::in_memory();
        session.set(Credential::new("remembered"));
        let mut app = app_with(&api, session);
        start(&mut app).await;
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.dashboard.inbox.visible().len(), 3);
    }

    #[tokio::test]
    async fn login_mounts_the_console() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let mut app = app_with(&api, Session::in_memory());
        start(&mut app).await;
        sign_in(&mut app, "hunter2").await;

        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.login.password.is_empty());
        assert_eq!(
            app.dashboard.gate().session().get().map(|c| c.as_str().to_string()),
            Some("stub-token".to_string())
        );
        assert_eq!(app.dashboard.summary.summary().unread_messages, 2);
    }

    #[tokio::test]
    async fn rejected_login_stays_put() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let mut app = app_with(&api, Session::in_memory());
        start(&mut app).await;
        sign_in(&mut app, "wrong").await;

        assert_eq!(app.mode, InputMode::Login);
        assert_eq!(app.login.error.as_deref(), Some("Invalid credentials"));
        assert!(app.login.password.is_empty());
        assert_eq!(app.login.email, "admin@example.com");
        assert_eq!(api.calls(Endpoint::List), 0);
    }

    #[tokio::test]
    async fn eviction_returns_to_login() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let mut app = app_with(&api, Session::in_memory());
        start(&mut app).await;
        sign_in(&mut app, "hunter2").await;

        api.fail(Endpoint::List, ApiError::Unauthorized);
        app.handle_action(Action::Refresh).await.unwrap();
        app.sync_route().await;

        assert_eq!(app.mode, InputMode::Login);
        assert!(!app.dashboard.is_mounted());
        assert!(app.login.error.is_some());
    }

    #[tokio::test]
    async fn search_filters_as_you_type() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let session = Session::in_memory();
        session.set(Credential::new("tok"));
        let mut app = app_with(&api, session);
        start(&mut app).await;

        app.handle_action(Action::EnterSearch).await.unwrap();
        type_text(&mut app, "cle").await;
        assert_eq!(app.dashboard.inbox.visible().len(), 1);
        app.handle_action(Action::InputCancel).await.unwrap();
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.dashboard.inbox.visible().len(), 3);
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let session = Session::in_memory();
        session.set(Credential::new("tok"));
        let mut app = app_with(&api, session);
        start(&mut app).await;

        app.handle_action(Action::ToggleSelect).await.unwrap();
        app.handle_action(Action::DeleteSelected).await.unwrap();
        assert!(app.confirm_delete);
        assert_eq!(api.calls(Endpoint::BulkDelete), 0);

        app.answer_confirm(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE))
            .await;
        assert_eq!(api.calls(Endpoint::BulkDelete), 0);

        app.handle_action(Action::DeleteSelected).await.unwrap();
        app.answer_confirm(KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE))
            .await;
        assert_eq!(api.bulk_requests(), vec![vec![MessageId::Number(1)]]);
        assert_eq!(app.dashboard.inbox.messages().len(), 2);
    }

    #[tokio::test]
    async fn moving_past_the_page_turns_it() {
        let messages = (1..=7)
            .map(|i| make_message(i, "Ada", "body", false))
            .collect();
        let api = Arc::new(StubApi::with_messages(messages));
        let session = Session::in_memory();
        session.set(Credential::new("tok"));
        let mut app = app_with(&api, session);
        start(&mut app).await;
        app.dashboard.inbox.set_page_size(5).unwrap();

        for _ in 0..5 {
            app.handle_action(Action::MoveDown).await.unwrap();
        }
        assert_eq!(app.dashboard.inbox.page(), 1);
        assert_eq!(app.cursor, 0);
        app.handle_action(Action::MoveUp).await.unwrap();
        assert_eq!(app.dashboard.inbox.page(), 0);
        assert_eq!(app.cursor, 4);
    }

    #[tokio::test]
    async fn detail_follows_toggle_read() {
        let api = Arc::new(StubApi::with_messages(scenario()));
        let session = Session::in_memory();
        session.set(Credential::new("tok"));
        let mut app = app_with(&api, session);
        start(&mut app).await;

        app.handle_action(Action::OpenDetail).await.unwrap();
        assert_eq!(app.mode, InputMode::Detail);
        app.handle_action(Action::ToggleRead).await.unwrap();
        assert_eq!(api.read_requests(), vec![(MessageId::Number(1), true)]);
        app.handle_action(Action::CloseDetail).await.unwrap();
        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.dashboard.inbox.detail().is_none());
    }
}
