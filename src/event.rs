use parking_lot::Mutex;
use std::sync::Arc;

use crate::export::ResourceHandle;

/// Notifications emitted to the host
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatorEvent {
    /// An export slot finished encoding. Carries the current pair of handles,
    /// not just the one that changed; fires once per completed encode.
    AnnotationsChanged {
        composed: Option<ResourceHandle>,
        annotation_only: Option<ResourceHandle>,
    },
    /// The history pointer moved because of a stroke or internal navigation
    IndexChanged(isize),
    /// The host asked for an index outside the recorded history
    IndexRequested(isize),
}

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &AnnotatorEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&AnnotatorEvent) + Send,
{
    fn handle_event(&mut self, event: &AnnotatorEvent) {
        self(event)
    }
}

type SharedHandler = Arc<Mutex<Box<dyn EventHandler>>>;

/// Broadcasts annotator events to registered handlers.
///
/// Encode completions publish from executor threads, so the handler list is
/// behind a lock. The list lock is released before handlers run, so a handler
/// may subscribe others. Handlers must not emit on the bus that calls them.
pub struct EventBus {
    handlers: Mutex<Vec<SharedHandler>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.lock().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.lock().push(Arc::new(Mutex::new(handler)));
    }

    /// Emit an event to all registered handlers
    pub fn emit(&self, event: AnnotatorEvent) {
        log::debug!("Emitting {event:?}");
        let handlers: Vec<SharedHandler> = self.handlers.lock().clone();
        for handler in handlers {
            handler.lock().handle_event(&event);
        }
    }
}
