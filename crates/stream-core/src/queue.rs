//! Bounded producer/consumer queue with a waiting push and a deadline-bound pop.
//!
//! The queue is closed once every producer handle has been dropped; the
//! consumer then observes [`Pop::Closed`] after the remaining items.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is closed")]
pub struct QueueClosed;

/// Result of a deadline-bound pop.
#[derive(Debug, PartialEq)]
pub enum Pop<T> {
    Item(T),
    TimedOut,
    Closed,
}

/// Number of items pushed but not yet popped.
#[derive(Debug, Clone, Default)]
pub struct QueueGauge(Arc<AtomicUsize>);

impl QueueGauge {
    pub fn pending(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let gauge = QueueGauge::default();
    (
        QueueProducer {
            tx,
            gauge: gauge.clone(),
        },
        QueueConsumer { rx, gauge },
    )
}

#[derive(Debug)]
pub struct QueueProducer<T> {
    tx: mpsc::Sender<T>,
    gauge: QueueGauge,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            gauge: self.gauge.clone(),
        }
    }
}

impl<T> QueueProducer<T> {
    /// Waits for a free slot, then enqueues `item`.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        let permit = self.tx.reserve().await.map_err(|_| QueueClosed)?;
        // Count before the item becomes visible so the gauge never underflows.
        self.gauge.0.fetch_add(1, Ordering::SeqCst);
        permit.send(item);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct QueueConsumer<T> {
    rx: mpsc::Receiver<T>,
    gauge: QueueGauge,
}

impl<T> QueueConsumer<T> {
    /// Pops the next item, giving up at `deadline`.
    pub async fn pop_until(&mut self, deadline: Instant) -> Pop<T> {
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(item)) => {
                self.gauge.0.fetch_sub(1, Ordering::SeqCst);
                Pop::Item(item)
            }
            Ok(None) => Pop::Closed,
            Err(_) => Pop::TimedOut,
        }
    }

    /// Refuses further pushes. Items already queued can still be popped.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn gauge(&self) -> QueueGauge {
        self.gauge.clone()
    }
}
