use crate::{
    cursor::RowCursor,
    error::CursorError,
    queue::QueueProducer,
    session::{FetchGuard, Fetched, IterationSession},
};
use std::{future::Future, sync::Arc};
use tracing::{debug, info, warn};

/// How a single fetch run ended.
#[derive(Debug)]
enum RunOutcome {
    /// The batch limit was reached and the cursor has more rows.
    Paused,
    /// The cursor has no more rows.
    Exhausted,
    Failed(CursorError),
    Cancelled,
    /// The consumer side went away.
    Abandoned,
}

impl IterationSession {
    /// One fetch run: moves at most `batch_limit` rows from the cursor into
    /// the channel. The guard releases the `Fetching` marker when the run
    /// returns or is dropped.
    pub(crate) async fn run_fetch(self: Arc<Self>, guard: FetchGuard) {
        let _guard = guard;
        let Some(producer) = self.producer() else {
            debug!(session = %self.id, "Row channel already closed, skipping fetch");
            return;
        };

        let run = self.metrics.increment_runs();
        let mut fetched = 0usize;

        let outcome = match self.cancellable(self.cursor.lock()).await {
            Some(mut cursor) => self.pull(&mut **cursor, &producer, &mut fetched).await,
            None => RunOutcome::Cancelled,
        };

        match outcome {
            RunOutcome::Paused => {
                debug!(session = %self.id, run, fetched, "Batch limit reached");
            }
            RunOutcome::Exhausted => {
                self.mark_finished();
                self.take_producer();
                info!(session = %self.id, run, fetched, "Result exhausted");
                self.release_cursor();
            }
            RunOutcome::Failed(err) => {
                self.metrics.increment_fetch_errors();
                self.mark_finished();
                warn!(session = %self.id, run, fetched, error = %err, "Fetch failed");
                // Recorded up front so the end of the stream carries it even if
                // the terminal item never reaches the channel.
                self.record_error(err.to_string());
                match self
                    .cancellable(producer.push(Fetched::Failed(err.to_string())))
                    .await
                {
                    Some(Ok(())) => {}
                    Some(Err(_)) => {
                        warn!(session = %self.id, "Row channel closed before the fetch error")
                    }
                    None => debug!(session = %self.id, "Fetch error dropped by cancellation"),
                }
                self.take_producer();
                self.release_cursor();
            }
            RunOutcome::Cancelled => {
                debug!(session = %self.id, run, fetched, "Fetch stopped by cancellation");
            }
            RunOutcome::Abandoned => {
                debug!(session = %self.id, run, fetched, "Row channel closed by consumer");
            }
        }
    }

    async fn pull(
        &self,
        cursor: &mut dyn RowCursor,
        producer: &QueueProducer<Fetched>,
        fetched: &mut usize,
    ) -> RunOutcome {
        let limit = self.options.batch_limit;

        loop {
            if self.state.is_closed() {
                return RunOutcome::Cancelled;
            }

            let has_next = match self.cancellable(cursor.has_next()).await {
                Some(has_next) => has_next,
                None => return RunOutcome::Cancelled,
            };

            // A full batch still asks the cursor once more, so a result whose
            // length is a multiple of the limit ends here instead of costing an
            // extra empty run.
            if *fetched == limit {
                return if has_next {
                    RunOutcome::Paused
                } else {
                    RunOutcome::Exhausted
                };
            }
            if !has_next {
                return RunOutcome::Exhausted;
            }

            let row = match self.cancellable(cursor.next()).await {
                Some(Ok(row)) => row,
                Some(Err(err)) => return RunOutcome::Failed(err),
                None => return RunOutcome::Cancelled,
            };

            // Backpressure point: waits while the channel is full.
            match self.cancellable(producer.push(Fetched::Row(row))).await {
                Some(Ok(())) => {}
                Some(Err(_)) => return RunOutcome::Abandoned,
                None => return RunOutcome::Cancelled,
            }

            *fetched += 1;
            self.metrics.increment_fetched(1);
        }
    }

    /// Races `fut` against cancellation of the session. Returns `None` when
    /// the session was cancelled first; the pending future is dropped.
    async fn cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}
