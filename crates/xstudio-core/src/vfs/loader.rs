//! Background game data loading
//!
//! Building the virtual filesystem opens and scans every catalog, which is too
//! slow for a UI thread. [`GameDataLoader`] runs the build on a worker thread
//! and reports progress over a channel. The finished [`XFileSystem`] only
//! becomes visible through the final [`LoadEvent::Completed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::error::CatalogError;
use super::filesystem::{FeedbackKind, LoadFeedback, LoadOperation, XFileSystem};
use crate::config::GameDataConfig;

/// Message sent by the loader thread
#[derive(Debug)]
pub enum LoadEvent {
    /// Progress report
    Progress(LoadFeedback),
    /// The filesystem is ready; ownership passes to the receiver
    Completed(XFileSystem),
    /// Loading failed; every catalog was released
    Failed(String),
    /// Loading stopped after [`GameDataLoader::cancel`]
    Cancelled,
}

impl LoadEvent {
    /// Whether this is the last event of a load
    pub fn is_final(&self) -> bool {
        !matches!(self, LoadEvent::Progress(_))
    }
}

/// Handle to a running game data load
#[derive(Debug)]
pub struct GameDataLoader {
    receiver: Receiver<LoadEvent>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GameDataLoader {
    /// Spawn the worker thread
    pub fn start(config: GameDataConfig) -> Result<Self, CatalogError> {
        let (sender, receiver) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();

        let handle = std::thread::Builder::new()
            .name("game-data".to_string())
            .spawn(move || {
                let progress_sender = sender.clone();
                let result = XFileSystem::build(&config, &cancel_flag, |feedback| {
                    let _ = progress_sender.send(LoadEvent::Progress(feedback));
                });

                let event = match result {
                    Ok(vfs) => LoadEvent::Completed(vfs),
                    Err(CatalogError::Cancelled) => {
                        tracing::info!("Game data loading cancelled");
                        LoadEvent::Cancelled
                    }
                    Err(e) => {
                        tracing::error!("Game data loading failed: {}", e);
                        let _ = sender.send(LoadEvent::Progress(LoadFeedback::new(
                            LoadOperation::Complete,
                            100,
                            FeedbackKind::Failure,
                            e.to_string(),
                        )));
                        LoadEvent::Failed(e.to_string())
                    }
                };
                // The receiver may be gone; the filesystem is then dropped here
                let _ = sender.send(event);
            })?;

        Ok(Self {
            receiver,
            cancel,
            handle: Some(handle),
        })
    }

    /// Next event if one is waiting
    pub fn try_recv(&self) -> Option<LoadEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event; `None` once the worker has finished and every event was taken
    pub fn recv(&self) -> Option<LoadEvent> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Ask the worker to stop; it checks between catalog entries
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Block until the worker thread has exited
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Game data worker panicked");
            }
        }
    }

    /// Wait for the final event, passing progress reports to `on_progress`
    pub fn wait<F>(mut self, mut on_progress: F) -> LoadEvent
    where
        F: FnMut(&LoadFeedback),
    {
        let last = loop {
            match self.recv() {
                Some(LoadEvent::Progress(feedback)) => on_progress(&feedback),
                Some(event) => break event,
                None => break LoadEvent::Failed("game data worker stopped unexpectedly".to_string()),
            }
        };
        self.join();
        last
    }
}

impl Drop for GameDataLoader {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}
