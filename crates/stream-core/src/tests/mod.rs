mod session;

use crate::{cursor::RowCursor, error::CursorError};
use async_trait::async_trait;
use model::{ColumnMetadata, Row, Value};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Counters shared between a test and its scripted cursor.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub produced: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Tally {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// In-process cursor over `len` rows `[i, "row-i"]`.
pub(crate) struct ScriptedCursor {
    len: usize,
    next: usize,
    fail_at: Option<usize>,
    stall_at: Option<usize>,
    row_delay: Option<Duration>,
    hang_on_close: bool,
    broken_metadata: bool,
    tally: Arc<Tally>,
}

impl ScriptedCursor {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            next: 0,
            fail_at: None,
            stall_at: None,
            row_delay: None,
            hang_on_close: false,
            broken_metadata: false,
            tally: Arc::new(Tally::default()),
        }
    }

    /// Reading row `index` fails.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// `has_next` never returns once `index` rows were produced.
    pub fn stalling_at(mut self, index: usize) -> Self {
        self.stall_at = Some(index);
        self
    }

    pub fn with_row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = Some(delay);
        self
    }

    pub fn hanging_on_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }

    pub fn with_broken_metadata(mut self) -> Self {
        self.broken_metadata = true;
        self
    }

    pub fn tally(&self) -> Arc<Tally> {
        self.tally.clone()
    }

    pub fn boxed(self) -> Box<dyn RowCursor> {
        Box::new(self)
    }
}

pub(crate) fn expected_row(i: usize) -> Row {
    Row::new(vec![Value::Int(i as i64), Value::String(format!("row-{i}"))])
}

#[async_trait]
impl RowCursor for ScriptedCursor {
    fn columns(&self) -> Result<ColumnMetadata, CursorError> {
        if self.broken_metadata {
            return Err(CursorError::Metadata("no metadata".into()));
        }
        Ok(ColumnMetadata::new(["id", "label"]))
    }

    async fn has_next(&mut self) -> bool {
        self.tally.enter();
        if self.stall_at == Some(self.next) {
            std::future::pending::<()>().await;
        }
        self.tally.exit();
        self.next < self.len
    }

    async fn next(&mut self) -> Result<Row, CursorError> {
        self.tally.enter();
        if let Some(delay) = self.row_delay {
            tokio::time::sleep(delay).await;
        }
        self.tally.exit();

        if self.fail_at == Some(self.next) {
            return Err(CursorError::Fetch(format!("member left at row {}", self.next)));
        }
        if self.next >= self.len {
            return Err(CursorError::Exhausted);
        }
        let row = expected_row(self.next);
        self.next += 1;
        self.tally.produced.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.tally.closes.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
