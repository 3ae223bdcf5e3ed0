use crate::{
    close::{self, CloseHandle, CloseOutcome},
    cursor::{self, RowCursor, SharedCursor},
    error::SessionError,
    metrics::StreamMetrics,
    options::StreamOptions,
    queue::{self, QueueConsumer, QueueGauge, QueueProducer},
    state::{SessionState, StreamState},
};
use model::{ColumnMetadata, Row};
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

pub type SessionId = Uuid;

/// Item moved through the row channel.
///
/// A failed cursor read travels the same path as data, so the UI handles
/// errors exactly where it handles rows.
#[derive(Debug)]
pub(crate) enum Fetched {
    Row(Row),
    Failed(String),
}

/// Coordination point between one fetch worker and one drainer for a single
/// query result.
///
/// The session owns the cursor and the row channel. The UI keeps an `Arc` and
/// acts only through [`request_more_rows`](Self::request_more_rows),
/// [`drain`](Self::drain) and [`cancel`](Self::cancel).
pub struct IterationSession {
    pub(crate) id: SessionId,
    pub(crate) columns: ColumnMetadata,
    pub(crate) options: StreamOptions,
    pub(crate) cursor: SharedCursor,
    pub(crate) producer: Mutex<Option<QueueProducer<Fetched>>>,
    pub(crate) consumer: tokio::sync::Mutex<QueueConsumer<Fetched>>,
    pub(crate) gauge: QueueGauge,
    pub(crate) state: SessionState,
    pub(crate) finished: AtomicBool,
    pub(crate) end_delivered: AtomicBool,
    pub(crate) total_processed: AtomicUsize,
    pub(crate) last_error: Mutex<Option<String>>,
    pub(crate) cancel: CancellationToken,
    closer: Mutex<Option<CloseHandle>>,
    pub(crate) metrics: StreamMetrics,
}

impl std::fmt::Debug for IterationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationSession")
            .field("id", &self.id)
            .field("columns", &self.columns)
            .field("state", &self.state.load())
            .field("finished", &self.is_finished())
            .field("total_processed", &self.total_processed())
            .finish()
    }
}

impl IterationSession {
    /// Opens a session over `cursor` and launches the first fetch run.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`SessionError::Metadata`] when the column names cannot be read.
    pub fn start(
        cursor: Box<dyn RowCursor>,
        options: StreamOptions,
    ) -> Result<Arc<Self>, SessionError> {
        options.validate()?;
        let columns = cursor
            .columns()
            .map_err(|source| SessionError::Metadata { source })?;

        let (producer, consumer) = queue::bounded(options.channel_capacity());
        let gauge = consumer.gauge();

        let session = Arc::new(IterationSession {
            id: Uuid::new_v4(),
            columns,
            options,
            cursor: cursor::share(cursor),
            producer: Mutex::new(Some(producer)),
            consumer: tokio::sync::Mutex::new(consumer),
            gauge,
            state: SessionState::new(),
            finished: AtomicBool::new(false),
            end_delivered: AtomicBool::new(false),
            total_processed: AtomicUsize::new(0),
            last_error: Mutex::new(None),
            cancel: CancellationToken::new(),
            closer: Mutex::new(None),
            metrics: StreamMetrics::new(),
        });

        info!(
            session = %session.id,
            columns = session.columns.len(),
            batch_limit = options.batch_limit,
            "Iteration session started"
        );

        session.request_more_rows();
        Ok(session)
    }

    /// Launches another fetch run if the session is idle.
    ///
    /// Returns whether a run was launched. A running fetch, a finished stream
    /// or a closed session all make this a silent no-op, so callers may invoke
    /// it as often as they like.
    pub fn request_more_rows(self: &Arc<Self>) -> bool {
        if self.is_finished() {
            return false;
        }
        if !self.state.try_start_fetch() {
            debug!(session = %self.id, state = %self.state.load(), "Fetch not started");
            return false;
        }

        // The previous run may have flagged the end between the check and the swap.
        let guard = FetchGuard::new(Arc::clone(self));
        if self.is_finished() {
            return false;
        }

        tokio::spawn(Arc::clone(self).run_fetch(guard));
        true
    }

    /// Cancels the query.
    ///
    /// The session is closed for scheduling as soon as this returns; the
    /// cursor itself is released on a detached task. Returns false if the
    /// session was already closed.
    pub fn cancel(self: &Arc<Self>) -> bool {
        let Some(previous) = self.state.try_close() else {
            return false;
        };

        self.cancel.cancel();
        self.take_producer();

        info!(
            session = %self.id,
            previous = %previous,
            delivered = self.total_processed(),
            "Query cancelled"
        );

        self.release_cursor();
        true
    }

    /// Waits up to the configured close budget for the cursor to be released.
    ///
    /// Returns `None` when no close has been dispatched yet.
    pub async fn wait_closed(&self) -> Option<CloseOutcome> {
        let handle = self.close_handle()?;
        Some(handle.wait(self.options.close_wait_budget).await)
    }

    pub fn close_handle(&self) -> Option<CloseHandle> {
        lock(&self.closer).clone()
    }

    /// Dispatches the cursor close, at most once per session.
    pub(crate) fn release_cursor(&self) -> CloseHandle {
        let mut slot = lock(&self.closer);
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }
        let handle = close::spawn_close(Arc::clone(&self.cursor), self.id);
        *slot = Some(handle.clone());
        handle
    }

    pub(crate) fn producer(&self) -> Option<QueueProducer<Fetched>> {
        lock(&self.producer).clone()
    }

    /// Drops the session's producer handle. The channel closes once the
    /// running worker, if any, lets go of its clone.
    pub(crate) fn take_producer(&self) {
        lock(&self.producer).take();
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub(crate) fn record_error(&self, message: String) {
        *lock(&self.last_error) = Some(message);
    }

    pub(crate) fn take_error(&self) -> Option<String> {
        lock(&self.last_error).take()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn columns(&self) -> &ColumnMetadata {
        &self.columns
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub fn state(&self) -> StreamState {
        self.state.load()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// True once the cursor is exhausted or failed. Irreversible.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Rows handed to the UI so far.
    pub fn total_processed(&self) -> usize {
        self.total_processed.load(Ordering::SeqCst)
    }

    /// Rows buffered in the channel and not yet drained.
    pub fn pending_rows(&self) -> usize {
        self.gauge.pending()
    }

    pub fn is_end_delivered(&self) -> bool {
        self.end_delivered.load(Ordering::SeqCst)
    }

    /// Whether another drain could deliver something: a run is in flight,
    /// rows are buffered, or the end of stream has not been reported yet.
    pub fn needs_drain(&self) -> bool {
        if self.is_closed() || self.is_end_delivered() {
            return false;
        }
        self.state() == StreamState::Fetching || self.pending_rows() > 0 || self.is_finished()
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }
}

/// Holds the `Fetching` marker of one run and releases it on drop, whichever
/// way the run ends.
pub(crate) struct FetchGuard {
    session: Arc<IterationSession>,
}

impl FetchGuard {
    fn new(session: Arc<IterationSession>) -> Self {
        Self { session }
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if !self.session.state.finish_fetch() {
            debug!(session = %self.session.id, "Fetch ended after close");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
