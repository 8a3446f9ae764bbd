// ── Debounce buffer ──
//
// Trailing-edge debounce for bursty push feeds. Only the most recent
// value survives a burst; it is released once no newer value has arrived
// for the full window.
//
// The buffer owns no timer. Each `push` hands back a ticket; the caller
// schedules `fire(ticket)` after `window` and the buffer yields the value
// only if that ticket is still the latest one. Earlier tickets fire into
// nothing, which restarts the window on every push.

use std::time::Duration;

/// Quiet period required before a debounced value is released.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

/// Identifies one `push`; only the newest ticket releases the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    latest: u64,
    pending: Option<T>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            latest: 0,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value and restart the window.
    pub fn push(&mut self, value: T) -> Ticket {
        self.latest += 1;
        self.pending = Some(value);
        Ticket(self.latest)
    }

    /// Release the pending value if `ticket` is the newest one issued.
    pub fn fire(&mut self, ticket: Ticket) -> Option<T> {
        if ticket.0 == self.latest {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
