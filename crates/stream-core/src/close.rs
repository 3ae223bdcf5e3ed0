use crate::cursor::SharedCursor;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

/// Progress of a detached cursor close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseStatus {
    Pending,
    Closed,
    Failed(String),
}

/// What a bounded wait on a close observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Failed(String),
    /// The budget ran out; the close keeps running in the background.
    TimedOut,
}

/// Handle to a close running on its own task.
///
/// Closing a remote result can hang indefinitely when the server is gone, so
/// the close never runs on the caller's task. Callers that need to know
/// whether it completed poll with [`CloseHandle::wait`].
#[derive(Debug, Clone)]
pub struct CloseHandle {
    rx: watch::Receiver<CloseStatus>,
}

impl CloseHandle {
    pub async fn wait(&self, budget: Duration) -> CloseOutcome {
        let mut rx = self.rx.clone();
        match tokio::time::timeout(budget, rx.wait_for(|s| *s != CloseStatus::Pending)).await {
            Ok(Ok(status)) => match &*status {
                CloseStatus::Failed(reason) => CloseOutcome::Failed(reason.clone()),
                _ => CloseOutcome::Closed,
            },
            Ok(Err(_)) => CloseOutcome::Failed("close task ended without reporting".into()),
            Err(_) => CloseOutcome::TimedOut,
        }
    }
}

/// Spawns the close of `cursor` and returns immediately.
///
/// The close waits for the cursor lock, so a fetch run still holding it
/// finishes its current step first.
pub fn spawn_close(cursor: SharedCursor, session: Uuid) -> CloseHandle {
    let (tx, rx) = watch::channel(CloseStatus::Pending);

    tokio::spawn(async move {
        let mut cursor = cursor.lock().await;
        let status = match cursor.close().await {
            Ok(()) => {
                debug!(session = %session, "Cursor closed");
                CloseStatus::Closed
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Cursor close failed");
                CloseStatus::Failed(e.to_string())
            }
        };
        let _ = tx.send(status);
    });

    CloseHandle { rx }
}
