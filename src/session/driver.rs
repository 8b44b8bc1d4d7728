//! Async session driver
//!
//! Owns a [`LessonSession`] on a tokio task, serialises learner commands
//! through a queue and publishes a snapshot after every change. Delayed
//! advances arrive as tickets from the [`TokioScheduler`].

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::content::{ContentIntegrityError, ContentProvider, Lesson};
use crate::events::EventSink;
use crate::progress::{CompletionContext, ProgressStore};
use crate::services::Services;

use super::machine::LessonSession;
use super::scheduler::TokioScheduler;
use super::snapshot::SessionSnapshot;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Answer(usize),
    AcknowledgeRemediation,
    RevealHint,
    /// Skip the remaining delay after a correct answer.
    Advance,
    Abandon,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("session driver has stopped")]
    Closed,
}

/// Cloneable front end to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Closed)
    }

    pub async fn answer(&self, choice_index: usize) -> Result<(), DriverError> {
        self.send(SessionCommand::Answer(choice_index)).await
    }

    pub async fn acknowledge_remediation(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::AcknowledgeRemediation).await
    }

    pub async fn reveal_hint(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::RevealHint).await
    }

    pub async fn advance(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Advance).await
    }

    /// Stops the session without recording anything.
    pub async fn abandon(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Abandon).await
    }

    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }
}

pub struct SessionDriver;

impl SessionDriver {
    /// Starts `lesson` on a background task. The join handle yields the
    /// completion record, or `None` when the session was abandoned.
    pub fn spawn<C, P, E>(
        services: Services<C, P, E>,
        lesson: Lesson,
        advance_delay: Duration,
    ) -> Result<(SessionHandle, JoinHandle<Option<CompletionContext>>), ContentIntegrityError>
    where
        C: ContentProvider + 'static,
        P: ProgressStore + 'static,
        E: EventSink + 'static,
    {
        let (scheduler, mut tickets) = TokioScheduler::new();
        let mut session = LessonSession::start(services, lesson, scheduler, advance_delay)?;
        let lesson_id = session.lesson().id.clone();

        let (command_tx, mut commands) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let task = tokio::spawn(async move {
            while !session.is_finished() {
                tokio::select! {
                    command = commands.recv() => {
                        let Some(command) = command else {
                            debug!(
                                lesson_id = %lesson_id,
                                "all handles dropped, abandoning session"
                            );
                            break;
                        };
                        let result = match command {
                            SessionCommand::Answer(choice) => session.answer(choice),
                            SessionCommand::AcknowledgeRemediation => {
                                session.acknowledge_remediation()
                            }
                            SessionCommand::RevealHint => session.reveal_hint(),
                            SessionCommand::Advance => session.advance(),
                            SessionCommand::Abandon => {
                                info!(lesson_id = %lesson_id, "session abandoned");
                                break;
                            }
                        };
                        match result {
                            Ok(snapshot) => {
                                snapshot_tx.send_replace(snapshot);
                            }
                            Err(err) => warn!(
                                lesson_id = %lesson_id,
                                error = %err,
                                ?command,
                                "session command rejected"
                            ),
                        }
                    }
                    Some(ticket) = tickets.recv() => {
                        if let Some(snapshot) = session.fire(&ticket) {
                            snapshot_tx.send_replace(snapshot);
                        }
                    }
                }
            }
            session.completion().cloned()
        });

        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        Ok((handle, task))
    }
}
