use std::sync::Arc;

use crate::content::ContentProvider;
use crate::events::EventSink;
use crate::progress::ProgressStore;

/// Collaborators handed to every session and aggregator by the host app.
pub struct Services<C, P, E> {
    pub content: Arc<C>,
    pub progress: Arc<P>,
    pub events: Arc<E>,
}

impl<C, P, E> Services<C, P, E>
where
    C: ContentProvider,
    P: ProgressStore,
    E: EventSink,
{
    pub fn new(content: Arc<C>, progress: Arc<P>, events: Arc<E>) -> Self {
        Self {
            content,
            progress,
            events,
        }
    }
}

impl<C, P, E> Clone for Services<C, P, E> {
    fn clone(&self) -> Self {
        Self {
            content: Arc::clone(&self.content),
            progress: Arc::clone(&self.progress),
            events: Arc::clone(&self.events),
        }
    }
}
