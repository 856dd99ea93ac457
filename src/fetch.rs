/// Identifies one in-flight fetch. Results carrying a ticket from an older
/// generation are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic counter owned by a panel; advanced on unmount.
#[derive(Debug, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn issue(&self) -> Ticket {
        Ticket(self.0)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0 == ticket.0
    }

    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

/// What became of a fetch or mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Nothing to do; no request was sent.
    Skipped,
    /// Recoverable failure, surfaced as an inline error.
    Failed,
    /// Credential rejected; the session has been evicted.
    Unauthorized,
    /// The owning view was unmounted before the result arrived.
    Stale,
}
