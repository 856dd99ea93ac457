//! The message inbox controller.
//!
//! Owns the authoritative copy of the message collection as last fetched,
//! plus the client-only view state layered over it: search text, status
//! filter, page window, multi-select and the detail view. Filtering and
//! paging are recomputed from the collection on every call.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::access::Gate;
use crate::api::{AdminApi, ApiError};
use crate::fetch::{Generation, Outcome, Ticket};
use crate::message::{Message, MessageId, StatusFilter};

pub const DEFAULT_PAGE_SIZES: [usize; 3] = [5, 10, 25];
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("page size {0} is not one of the offered choices")]
    UnsupportedPageSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Errored,
    Unauthorized,
}

#[derive(Debug)]
pub struct MessageInbox {
    messages: Vec<Message>,
    phase: Phase,
    error: Option<String>,

    search: String,
    status: StatusFilter,
    page: usize,
    page_size: usize,
    page_sizes: Vec<usize>,
    selected: BTreeSet<MessageId>,
    detail: Option<Message>,

    generation: Generation,
}

impl Default for MessageInbox {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZES.to_vec(), DEFAULT_PAGE_SIZE)
    }
}

impl MessageInbox {
    /// `page_size` falls back to the first choice when it isn't offered.
    pub fn new(page_sizes: Vec<usize>, page_size: usize) -> Self {
        let mut page_sizes: Vec<usize> = page_sizes.into_iter().filter(|n| *n > 0).collect();
        if page_sizes.is_empty() {
            page_sizes = DEFAULT_PAGE_SIZES.to_vec();
        }
        let page_size = if page_sizes.contains(&page_size) {
            page_size
        } else {
            page_sizes[0]
        };
        Self {
            messages: Vec::new(),
            phase: Phase::Uninitialized,
            error: None,
            search: String::new(),
            status: StatusFilter::All,
            page: 0,
            page_size,
            page_sizes,
            selected: BTreeSet::new(),
            detail: None,
            generation: Generation::default(),
        }
    }

    // ── Authoritative state ─────────────────────────────────────────

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    #[cfg(test)]
    pub fn find(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    // ── Loading ─────────────────────────────────────────────────────

    pub fn begin_load(&mut self) -> Ticket {
        self.phase = Phase::Loading;
        self.error = None;
        self.generation.issue()
    }

    pub fn finish_load(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Message>, ApiError>,
        gate: &Gate,
    ) -> Outcome {
        let result = gate.settle(result);
        if !self.generation.is_current(ticket) {
            debug!("dropping message list for detached inbox");
            return Outcome::Stale;
        }
        match result {
            Ok(messages) => {
                debug!(count = messages.len(), "messages loaded");
                self.messages = messages;
                self.phase = Phase::Ready;
                self.resync_detail();
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => {
                self.phase = Phase::Unauthorized;
                Outcome::Unauthorized
            }
            Err(e) => {
                warn!(error = %e, "message fetch failed");
                self.error = Some("Failed to load messages".to_string());
                self.messages = Vec::new();
                self.phase = Phase::Errored;
                Outcome::Failed
            }
        }
    }

    pub async fn load(&mut self, api: &dyn AdminApi, gate: &Gate) -> Outcome {
        let ticket = self.begin_load();
        let result = api.list_messages().await;
        self.finish_load(ticket, result, gate)
    }

    /// Stop accepting results from fetches already in flight.
    pub fn detach(&mut self) {
        self.generation.advance();
    }

    fn resync_detail(&mut self) {
        if let Some(open) = self.detail.take() {
            self.detail = self.messages.iter().find(|m| m.id == open.id).cloned();
        }
    }

    // ── Search & filter ─────────────────────────────────────────────

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.page = 0;
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status = filter;
        self.page = 0;
    }

    /// Messages passing both the search text and the status filter, in
    /// server order.
    pub fn filtered(&self) -> Vec<&Message> {
        let needle = self.search.to_lowercase();
        self.messages
            .iter()
            .filter(|m| m.matches_search(&needle) && self.status.admits(m))
            .collect()
    }

    // ── Paging ──────────────────────────────────────────────────────

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[cfg(test)]
    pub fn page_sizes(&self) -> &[usize] {
        &self.page_sizes
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), ViewError> {
        if !self.page_sizes.contains(&size) {
            return Err(ViewError::UnsupportedPageSize(size));
        }
        self.page_size = size;
        self.page = 0;
        Ok(())
    }

    /// Move to the next offered page size, wrapping around.
    pub fn cycle_page_size(&mut self) -> Result<(), ViewError> {
        let idx = self
            .page_sizes
            .iter()
            .position(|n| *n == self.page_size)
            .unwrap_or(0);
        let next = self.page_sizes[(idx + 1) % self.page_sizes.len()];
        self.set_page_size(next)
    }

    /// Number of pages the filtered set spans; at least one.
    pub fn page_count(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size).max(1)
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.page_count() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// The current page window. A page past the end is simply empty.
    pub fn visible(&self) -> Vec<&Message> {
        let filtered = self.filtered();
        let start = self.page.saturating_mul(self.page_size).min(filtered.len());
        let end = start.saturating_add(self.page_size).min(filtered.len());
        filtered[start..end].to_vec()
    }

    // ── Selection ───────────────────────────────────────────────────

    pub fn selected(&self) -> &BTreeSet<MessageId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &MessageId) -> bool {
        self.selected.contains(id)
    }

    /// Checked selects every filtered message, not just the visible page.
    /// The selection is not pruned when the filter later changes.
    pub fn toggle_select_all(&mut self, checked: bool) {
        if checked {
            self.selected = self.filtered().into_iter().map(|m| m.id.clone()).collect();
        } else {
            self.selected.clear();
        }
    }

    pub fn toggle_select(&mut self, id: &MessageId) {
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
    }

    /// Header checkbox state: something is filtered and the selection is
    /// the same size as the filtered set.
    pub fn all_filtered_selected(&self) -> bool {
        let count = self.filtered().len();
        count > 0 && self.selected.len() == count
    }

    // ── Detail view ─────────────────────────────────────────────────

    pub fn detail(&self) -> Option<&Message> {
        self.detail.as_ref()
    }

    pub fn open_detail(&mut self, message: Message) {
        self.detail = Some(message);
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Drop the checked set and any open detail.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.detail = None;
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Flip `read` on the server. The local copy is left alone; on
    /// `Applied` the caller re-fetches the collection and the summary.
    pub async fn toggle_read(&mut self, api: &dyn AdminApi, gate: &Gate, message: &Message) -> Outcome {
        let target = !message.read;
        let result = gate.settle(api.set_read(&message.id, target).await);
        match result {
            Ok(()) => {
                info!(id = %message.id, read = target, "toggled read state");
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => {
                self.phase = Phase::Unauthorized;
                Outcome::Unauthorized
            }
            Err(e) => {
                warn!(id = %message.id, error = %e, "toggle read failed");
                self.error = Some("Failed to update message".to_string());
                Outcome::Failed
            }
        }
    }

    /// Delete every selected message in one request. All-or-nothing from
    /// this side: the selection survives a failure untouched.
    pub async fn delete_selected(&mut self, api: &dyn AdminApi, gate: &Gate) -> Outcome {
        if self.selected.is_empty() {
            return Outcome::Skipped;
        }
        let ids: Vec<MessageId> = self.selected.iter().cloned().collect();
        let result = gate.settle(api.bulk_delete(&ids).await);
        match result {
            Ok(()) => {
                info!(count = ids.len(), "deleted messages");
                self.selected.clear();
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => {
                self.phase = Phase::Unauthorized;
                Outcome::Unauthorized
            }
            Err(e) => {
                warn!(count = ids.len(), error = %e, "bulk delete failed");
                self.error = Some("Failed to delete messages".to_string());
                Outcome::Failed
            }
        }
    }
}
