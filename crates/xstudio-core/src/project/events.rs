//! Project change notifications
//!
//! Views register listeners on the [`ProjectDocument`](super::ProjectDocument) they
//! display. Listeners live exactly as long as the document (or until they
//! unsubscribe).

use std::fmt;

use super::item::{ItemKey, ProjectItem};
use crate::path::FilePath;

/// Something that happened to a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// The project was re-read from disk
    Loaded {
        /// Project file path
        path: FilePath,
    },
    /// The project was written to disk
    Saved {
        /// Project file path
        path: FilePath,
    },
    /// A node was added below `parent`
    ItemAdded {
        /// Snapshot of the new node
        item: ProjectItem,
        /// Node it was added to
        parent: ItemKey,
    },
    /// A node was modified in place (renamed, backup assigned, ...)
    ItemChanged {
        /// Snapshot after the change
        item: ProjectItem,
        /// Node holding it
        parent: ItemKey,
    },
    /// A node (and its subtree) was removed from `parent`
    ItemRemoved {
        /// The detached subtree
        item: ProjectItem,
        /// Node it was removed from
        parent: ItemKey,
    },
    /// A revision was committed for a tracked file
    Committed {
        /// Tracked file
        path: FilePath,
        /// Revision title
        title: String,
        /// Number of revisions now in the history
        revisions: usize,
    },
}

/// Handle returned by [`EventHub::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&ProjectEvent) + Send>;

/// Registered listeners of a single document
#[derive(Default)]
pub struct EventHub {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ProjectEvent) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener in registration order
    pub fn emit(&self, event: ProjectEvent) {
        tracing::trace!("Project event: {:?}", event);
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let mut hub = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = hub.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        assert_eq!(hub.len(), 1);

        hub.emit(ProjectEvent::Saved {
            path: FilePath::new("a.xprj"),
        });
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        hub.emit(ProjectEvent::Saved {
            path: FilePath::new("b.xprj"),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            ProjectEvent::Saved {
                path: FilePath::new("a.xprj")
            }
        );
    }
}
