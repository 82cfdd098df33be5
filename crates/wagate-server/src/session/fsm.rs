//! Connection lifecycle state machine and reconnect backoff.

use std::time::Duration;

/// Lifecycle state of the gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// Authenticated and ready for traffic.
    Open,
    /// Closed for a reason that allows another attempt.
    ClosedRetryable,
    /// Closed for good; operator intervention required.
    ClosedTerminal,
}

/// Enumerated transition triggers, independent of how the underlying
/// client reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    ConnectStarted,
    Opened,
    Closed { terminal: bool },
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Apply a transition trigger. `ClosedTerminal` is absorbing: once a
    /// session closes terminally, only a restart revives it.
    pub fn apply(self, event: StateEvent) -> ConnectionState {
        match (self, event) {
            (ConnectionState::ClosedTerminal, _) => ConnectionState::ClosedTerminal,
            (_, StateEvent::ConnectStarted) => ConnectionState::Connecting,
            (_, StateEvent::Opened) => ConnectionState::Open,
            (_, StateEvent::Closed { terminal: true }) => ConnectionState::ClosedTerminal,
            (_, StateEvent::Closed { terminal: false }) => ConnectionState::ClosedRetryable,
        }
    }
}

/// Capped exponential reconnect delay.
#[derive(Debug)]
pub struct Backoff {
    base_secs: u64,
    max_secs: u64,
    current_secs: u64,
}

impl Backoff {
    pub fn new(base_secs: u64, max_secs: u64) -> Self {
        Self {
            base_secs,
            max_secs,
            current_secs: base_secs,
        }
    }

    /// Delay before the next attempt. Doubles per consecutive failure up
    /// to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_secs;
        self.current_secs = self.current_secs.saturating_mul(2).min(self.max_secs);
        Duration::from_secs(delay)
    }

    /// Reset after a successful open.
    pub fn reset(&mut self) {
        self.current_secs = self.base_secs;
    }
}
