use crate::{
    queue::Pop,
    session::{Fetched, IterationSession},
};
use model::RowBatch;
use std::{sync::atomic::Ordering, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info};

/// Events the streaming core emits to the UI model.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Rows(RowBatch),
    /// Emitted exactly once per session, after the last rows. `error` carries
    /// the text of a fetch failure; a normal end has none.
    StreamFinished { error: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEnd {
    pub error: Option<String>,
}

/// Output of one drain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delivery {
    pub rows: RowBatch,
    /// Set on the delivery that observed the end of the stream.
    pub end: Option<StreamEnd>,
}

impl Delivery {
    pub fn is_final(&self) -> bool {
        self.end.is_some()
    }

    pub fn into_events(self) -> Vec<UiEvent> {
        let mut events = Vec::with_capacity(2);
        if !self.rows.is_empty() {
            events.push(UiEvent::Rows(self.rows));
        }
        if let Some(end) = self.end {
            events.push(UiEvent::StreamFinished { error: end.error });
        }
        events
    }
}

impl IterationSession {
    /// Collects buffered rows for at most `deadline`.
    ///
    /// Returns early with a final delivery once the channel is seen closed.
    /// An empty delivery only means nothing arrived in time. Returns `None`
    /// when another drain is already running or the session was cancelled
    /// before the result could be handed over.
    pub async fn drain(&self, deadline: Duration) -> Option<Delivery> {
        let Ok(mut consumer) = self.consumer.try_lock() else {
            debug!(session = %self.id, "Drain already in flight");
            return None;
        };
        if self.state.is_closed() {
            return None;
        }
        self.metrics.increment_drains();

        let until = Instant::now() + deadline;
        let mut rows = RowBatch::new();
        let mut bytes = 0usize;

        let closed = loop {
            if Instant::now() >= until {
                break false;
            }
            match consumer.pop_until(until).await {
                Pop::Item(Fetched::Row(row)) => {
                    bytes += row.size_bytes();
                    rows.push(row);
                }
                Pop::Item(Fetched::Failed(message)) => self.record_error(message),
                Pop::TimedOut => break false,
                Pop::Closed => break true,
            }
        };

        // Cancelled while waiting: the rows are discarded, not an error.
        if self.state.is_closed() {
            debug!(session = %self.id, dropped = rows.len(), "Discarding drain after cancel");
            return None;
        }

        let delivered = rows.len();
        let total = self.total_processed.fetch_add(delivered, Ordering::SeqCst) + delivered;
        self.metrics
            .increment_delivered(delivered as u64, bytes as u64);

        let mut end = None;
        if closed {
            self.mark_finished();
            if !self.end_delivered.swap(true, Ordering::SeqCst) {
                let error = self.take_error();
                info!(
                    session = %self.id,
                    total,
                    failed = error.is_some(),
                    "Stream finished"
                );
                end = Some(StreamEnd { error });
            }
        }

        Some(Delivery { rows, end })
    }
}
