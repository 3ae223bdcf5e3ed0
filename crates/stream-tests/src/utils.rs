use async_trait::async_trait;
use model::{ColumnMetadata, Row, Value};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use stream_core::{CursorError, IterationSession, RowCursor, UiEvent};
use tokio::sync::Notify;

/// What an [`InstrumentedCursor`] saw.
#[derive(Debug, Default)]
pub struct Counters {
    produced: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

impl Counters {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }

    /// Most cursor calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Cursor over `len` rows `[i, "item-i"]` that records every call.
///
/// A gate makes `has_next` wait at a given row until the test opens it.
pub struct InstrumentedCursor {
    len: usize,
    position: usize,
    gate: Option<(usize, Arc<Notify>)>,
    fail_at: Option<usize>,
    row_delay: Option<Duration>,
    counters: Arc<Counters>,
}

impl InstrumentedCursor {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            position: 0,
            gate: None,
            fail_at: None,
            row_delay: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Blocks before row `index` until the returned handle is notified.
    pub fn gated_at(mut self, index: usize) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some((index, gate.clone()));
        (self, gate)
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn with_row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = Some(delay);
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn boxed(self) -> Box<dyn RowCursor> {
        Box::new(self)
    }
}

pub fn item(i: usize) -> Row {
    Row::new(vec![Value::Int(i as i64), Value::String(format!("item-{i}"))])
}

#[async_trait]
impl RowCursor for InstrumentedCursor {
    fn columns(&self) -> Result<ColumnMetadata, CursorError> {
        Ok(ColumnMetadata::new(["id", "item"]))
    }

    async fn has_next(&mut self) -> bool {
        self.counters.enter();
        if let Some((index, gate)) = &self.gate {
            if *index == self.position {
                gate.notified().await;
            }
        }
        self.counters.exit();
        self.position < self.len
    }

    async fn next(&mut self) -> Result<Row, CursorError> {
        self.counters.enter();
        if let Some(delay) = self.row_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.exit();

        if self.fail_at == Some(self.position) {
            return Err(CursorError::Fetch(format!(
                "server closed the connection at row {}",
                self.position
            )));
        }
        if self.position >= self.len {
            return Err(CursorError::Exhausted);
        }
        let row = item(self.position);
        self.position += 1;
        self.counters.produced.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything the UI would have received from one session.
#[derive(Debug, Default)]
pub struct Collected {
    pub rows: Vec<Row>,
    pub events: Vec<UiEvent>,
    /// `total_processed` after each drain that delivered rows.
    pub totals: Vec<usize>,
}

impl Collected {
    pub fn finished_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, UiEvent::StreamFinished { .. }))
            .count()
    }

    pub fn error(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            UiEvent::StreamFinished { error } => error.as_deref(),
            UiEvent::Rows(_) => None,
        })
    }
}

/// Drains and requests more rows until the stream finishes, then drains
/// twice more to catch a duplicate end.
pub async fn drain_to_end(session: &Arc<IterationSession>, deadline: Duration) -> Collected {
    let mut collected = Collected::default();
    let mut extra = 0;

    while extra < 2 {
        let delivery = session
            .drain(deadline)
            .await
            .expect("session closed while draining");
        let delivered = !delivery.rows.is_empty();
        for event in delivery.into_events() {
            if let UiEvent::Rows(batch) = &event {
                collected.rows.extend(batch.iter().cloned());
            }
            collected.events.push(event);
        }
        if delivered {
            collected.totals.push(session.total_processed());
        }

        if session.is_end_delivered() {
            extra += 1;
        } else {
            session.request_more_rows();
        }
    }

    collected
}
