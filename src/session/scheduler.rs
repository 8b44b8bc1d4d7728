use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

/// Handle for one scheduled advance. Cloning shares the cancellation flag.
#[derive(Debug, Clone)]
pub struct AdvanceTicket {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl AdvanceTicket {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceDispatch {
    /// Apply the advance before returning to the caller.
    Immediate,
    /// The ticket will be handed back to the session later.
    Deferred,
}

/// Decides when the advance after a correct answer happens.
pub trait AdvanceScheduler {
    fn schedule(&self, delay: Duration, ticket: AdvanceTicket) -> AdvanceDispatch;
}

/// Zero-delay scheduler; every advance happens inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl AdvanceScheduler for ImmediateScheduler {
    fn schedule(&self, _delay: Duration, _ticket: AdvanceTicket) -> AdvanceDispatch {
        AdvanceDispatch::Immediate
    }
}

/// Sleeps on the tokio runtime, then delivers the ticket over a channel
/// unless it was cancelled in the meantime. Must be used from within a
/// runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tickets: mpsc::UnboundedSender<AdvanceTicket>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AdvanceTicket>) {
        let (tickets, receiver) = mpsc::unbounded_channel();
        (Self { tickets }, receiver)
    }
}

impl AdvanceScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, ticket: AdvanceTicket) -> AdvanceDispatch {
        if delay.is_zero() {
            return AdvanceDispatch::Immediate;
        }

        let tickets = self.tickets.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if ticket.is_cancelled() {
                debug!(ticket = ticket.id(), "advance cancelled before delivery");
                return;
            }
            let _ = tickets.send(ticket);
        });
        AdvanceDispatch::Deferred
    }
}
