use std::sync::Arc;

use tracing::debug;

use crate::access::{Access, Gate};
use crate::api::AdminApi;
use crate::fetch::Outcome;
use crate::inbox::MessageInbox;
use crate::message::Message;
use crate::summary::SummaryPanel;

/// The console behind the access guard: summary counters and the inbox,
/// fed by one API client and one gate.
pub struct Dashboard {
    api: Arc<dyn AdminApi>,
    gate: Gate,
    pub summary: SummaryPanel,
    pub inbox: MessageInbox,
    mounted: bool,
}

impl Dashboard {
    pub fn new(api: Arc<dyn AdminApi>, gate: Gate, inbox: MessageInbox) -> Self {
        Self {
            api,
            gate,
            summary: SummaryPanel::default(),
            inbox,
            mounted: false,
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Enter the console. Returns false (and fetches nothing) when the
    /// guard redirects to login.
    pub async fn mount(&mut self) -> bool {
        if self.gate.enter() == Access::Redirected {
            debug!("mount refused: no credential");
            return false;
        }
        self.mounted = true;
        self.refresh().await;
        true
    }

    /// Fetch summary and messages concurrently; each lands in its own panel.
    pub async fn refresh(&mut self) -> (Outcome, Outcome) {
        let api = self.api.as_ref();
        let gate = &self.gate;
        tokio::join!(self.summary.load(api, gate), self.inbox.load(api, gate))
    }

    pub async fn toggle_read(&mut self, message: &Message) -> Outcome {
        let outcome = self
            .inbox
            .toggle_read(self.api.as_ref(), &self.gate, message)
            .await;
        if outcome == Outcome::Applied {
            self.refresh().await;
        }
        outcome
    }

    pub async fn delete_selected(&mut self) -> Outcome {
        let outcome = self
            .inbox
            .delete_selected(self.api.as_ref(), &self.gate)
            .await;
        if outcome == Outcome::Applied {
            self.refresh().await;
        }
        outcome
    }

    /// Leave the console; results still in flight are discarded.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.summary.detach();
        self.inbox.detach();
        self.inbox.clear_selection();
    }

    pub fn logout(&mut self) {
        self.unmount();
        self.gate.logout();
    }

    /// Inline errors from either panel, summary first.
    pub fn errors(&self) -> Vec<&str> {
        self.summary
            .error()
            .into_iter()
            .chain(self.inbox.error())
            .collect()
    }

    pub fn dismiss_errors(&mut self) {
        self.summary.dismiss_error();
        self.inbox.dismiss_error();
    }
}
