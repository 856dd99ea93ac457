use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::access::Gate;
use crate::api::{AdminApi, ApiError};
use crate::fetch::{Generation, Outcome, Ticket};
use crate::message::Message;

/// Server-computed counters. Never derived from the local collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub unread_messages: u64,
    #[serde(default)]
    pub latest_message: Option<Message>,
}

impl Summary {
    pub fn latest_display(&self) -> String {
        self.latest_message
            .as_ref()
            .map(|m| m.date_display())
            .unwrap_or_else(|| "No messages".to_string())
    }
}

#[derive(Debug, Default)]
pub struct SummaryPanel {
    summary: Summary,
    error: Option<String>,
    loading: bool,
    generation: Generation,
}

impl SummaryPanel {
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin(&mut self) -> Ticket {
        self.loading = true;
        self.generation.issue()
    }

    pub fn apply(&mut self, ticket: Ticket, result: Result<Summary, ApiError>, gate: &Gate) -> Outcome {
        // Eviction applies even if the panel is gone.
        let result = gate.settle(result);
        if !self.generation.is_current(ticket) {
            debug!("dropping summary for detached panel");
            return Outcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(summary) => {
                self.summary = summary;
                self.error = None;
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => Outcome::Unauthorized,
            Err(e) => {
                warn!(error = %e, "summary fetch failed");
                self.error = Some("Failed to load dashboard data".to_string());
                Outcome::Failed
            }
        }
    }

    pub async fn load(&mut self, api: &dyn AdminApi, gate: &Gate) -> Outcome {
        let ticket = self.begin();
        let result = api.dashboard().await;
        self.apply(ticket, result, gate)
    }

    pub fn detach(&mut self) {
        self.generation.advance();
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Route, Router};
    use crate::api::stub::{Endpoint, StubApi};
    use crate::message::make_message;
    use crate::session::{Credential, Session};

    fn gate() -> Gate {
        let session = Session::in_memory();
        session.set(Credential::new("tok"));
        let router = Router::default();
        router.navigate(Route::Console);
        Gate::new(session, router)
    }

    #[test]
    fn parses_empty_dashboard() {
        let json = r#"{"total_messages": 0, "unread_messages": 0, "latest_message": null}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.latest_display(), "No messages");
    }

    #[test]
    fn latest_without_a_date_shows_a_dash() {
        let json = r#"{"total_messages": 1, "unread_messages": 1,
            "latest_message": {"id": 7, "name": "Ada", "email": "ada@example.com",
                               "message": "hi", "created_at": null, "read": false}}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.total_messages, 1);
        assert_eq!(summary.latest_display(), "-");
    }

    #[tokio::test]
    async fn success_replaces_summary_wholesale() {
        let api = StubApi::with_messages(vec![
            make_message(1, "A", "a", false),
            make_message(2, "B", "b", true),
        ]);
        let gate = gate();
        let mut panel = SummaryPanel::default();
        assert_eq!(panel.load(&api, &gate).await, Outcome::Applied);
        assert_eq!(panel.summary().total_messages, 2);
        assert_eq!(panel.summary().unread_messages, 1);
        assert!(panel.summary().latest_message.is_some());
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn failure_is_recoverable_and_keeps_session() {
        let api = StubApi::with_messages(vec![make_message(1, "A", "a", false)]);
        let gate = gate();
        let mut panel = SummaryPanel::default();
        panel.load(&api, &gate).await;

        api.fail(Endpoint::Dashboard, ApiError::Network("refused".into()));
        assert_eq!(panel.load(&api, &gate).await, Outcome::Failed);
        assert_eq!(panel.error(), Some("Failed to load dashboard data"));
        assert_eq!(panel.summary().total_messages, 1);
        assert!(gate.session().is_active());
        // One attempt, no retry.
        assert_eq!(api.calls(Endpoint::Dashboard), 2);

        panel.dismiss_error();
        assert!(panel.error().is_none());
    }

    #[tokio::test]
    async fn unauthorized_evicts_without_inline_error() {
        let api = StubApi::default();
        api.fail(Endpoint::Dashboard, ApiError::Unauthorized);
        let gate = gate();
        let mut panel = SummaryPanel::default();
        assert_eq!(panel.load(&api, &gate).await, Outcome::Unauthorized);
        assert!(panel.error().is_none());
        assert!(gate.session().get().is_none());
        assert_eq!(gate.router().current(), Route::Login);
    }

    #[tokio::test]
    async fn panel_recovers_after_eviction_and_sign_in() {
        let api = StubApi::with_messages(vec![make_message(1, "A", "a", false)]);
        api.fail(Endpoint::Dashboard, ApiError::Unauthorized);
        let gate = gate();
        let mut panel = SummaryPanel::default();
        assert_eq!(panel.load(&api, &gate).await, Outcome::Unauthorized);

        api.heal(Endpoint::Dashboard);
        gate.session().set(Credential::new("tok2"));
        assert_eq!(panel.load(&api, &gate).await, Outcome::Applied);
        assert!(!panel.is_loading());
        assert!(panel.error().is_none());
        assert_eq!(panel.summary().total_messages, 1);
    }

    #[test]
    fn detached_panel_ignores_late_results() {
        let gate = gate();
        let mut panel = SummaryPanel::default();
        let ticket = panel.begin();
        panel.detach();
        let late = Summary {
            total_messages: 9,
            ..Summary::default()
        };
        assert_eq!(panel.apply(ticket, Ok(late), &gate), Outcome::Stale);
        assert_eq!(panel.summary().total_messages, 0);
    }
}
