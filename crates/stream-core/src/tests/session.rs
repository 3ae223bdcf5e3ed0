#[cfg(test)]
mod tests {
    use crate::{
        close::CloseOutcome,
        drain::{StreamEnd, UiEvent},
        error::SessionError,
        options::StreamOptions,
        session::IterationSession,
        state::StreamState,
        tests::{ScriptedCursor, expected_row},
    };
    use std::{sync::atomic::Ordering, time::Duration};
    use tracing_test::traced_test;

    const TICK: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn delivers_rows_in_batch_sized_runs() {
        let cursor = ScriptedCursor::new(120);
        let tally = cursor.tally();
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let first = session.drain(TICK).await.unwrap();
        assert_eq!(first.rows.len(), 50);
        assert!(first.end.is_none());
        assert_eq!(session.total_processed(), 50);
        assert_eq!(tally.produced(), 50);
        assert_eq!(session.state(), StreamState::Idle);

        assert!(session.request_more_rows());
        let second = session.drain(TICK).await.unwrap();
        assert_eq!(second.rows.len(), 50);
        assert_eq!(session.total_processed(), 100);

        assert!(session.request_more_rows());
        let last = session.drain(TICK).await.unwrap();
        assert_eq!(last.rows.len(), 20);
        assert_eq!(last.end, Some(StreamEnd { error: None }));
        assert_eq!(session.total_processed(), 120);
        assert!(session.is_finished());

        let rows: Vec<_> = first
            .rows
            .into_iter()
            .chain(second.rows)
            .chain(last.rows)
            .collect();
        assert_eq!(rows[0], expected_row(0));
        assert_eq!(rows[119], expected_row(119));

        assert_eq!(session.wait_closed().await, Some(CloseOutcome::Closed));
        assert_eq!(tally.closes(), 1);
        let metrics = session.metrics().snapshot();
        assert_eq!(metrics.fetch_runs, 3);
        assert_eq!(metrics.rows_delivered, 120);
        let bytes: usize = rows.iter().map(|row| row.size_bytes()).sum();
        assert_eq!(metrics.bytes_delivered, bytes as u64);
        assert!(!session.request_more_rows());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_result_finishes_on_first_drain() {
        let session =
            IterationSession::start(ScriptedCursor::new(0).boxed(), StreamOptions::default())
                .unwrap();

        let delivery = session.drain(TICK).await.unwrap();
        assert!(delivery.rows.is_empty());
        assert_eq!(
            delivery.into_events(),
            vec![UiEvent::StreamFinished { error: None }]
        );
        assert_eq!(session.total_processed(), 0);
        assert!(!session.needs_drain());
    }

    #[tokio::test(start_paused = true)]
    async fn exact_multiple_of_batch_needs_no_extra_run() {
        let session =
            IterationSession::start(ScriptedCursor::new(100).boxed(), StreamOptions::default())
                .unwrap();

        let first = session.drain(TICK).await.unwrap();
        assert_eq!(first.rows.len(), 50);
        assert!(!first.is_final());

        assert!(session.request_more_rows());
        let second = session.drain(TICK).await.unwrap();
        assert_eq!(second.rows.len(), 50);
        assert!(second.is_final());

        assert!(!session.request_more_rows());
        assert_eq!(session.metrics().snapshot().fetch_runs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_delivers_partial_rows_then_error() {
        let cursor = ScriptedCursor::new(120).failing_at(30);
        let tally = cursor.tally();
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let delivery = session.drain(TICK).await.unwrap();
        assert_eq!(delivery.rows.len(), 30);
        let error = delivery.end.and_then(|end| end.error).unwrap();
        assert!(error.contains("member left at row 30"), "{error}");

        assert!(session.is_finished());
        assert!(!session.is_closed());
        assert!(!session.request_more_rows());
        assert_eq!(session.wait_closed().await, Some(CloseOutcome::Closed));
        assert_eq!(tally.closes(), 1);
        assert_eq!(session.metrics().snapshot().fetch_errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_on_first_row_still_ends_with_the_error() {
        let cursor = ScriptedCursor::new(10).failing_at(0);
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let delivery = session.drain(TICK).await.unwrap();
        assert!(delivery.rows.is_empty());
        let events = delivery.into_events();
        assert_eq!(
            events,
            vec![UiEvent::StreamFinished {
                error: Some("Failed to fetch row: member left at row 0".into())
            }]
        );

        // The error is consumed by the one end event.
        let again = session.drain(TICK).await.unwrap();
        assert!(again.into_events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_stream_is_reported_once() {
        let session =
            IterationSession::start(ScriptedCursor::new(3).boxed(), StreamOptions::default())
                .unwrap();

        let delivery = session.drain(TICK).await.unwrap();
        assert!(delivery.is_final());

        let again = session.drain(TICK).await.unwrap();
        assert!(again.rows.is_empty());
        assert!(again.end.is_none());
        assert!(session.is_end_delivered());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn cancel_mid_batch_stops_worker_and_closes_once() {
        let cursor = ScriptedCursor::new(200).stalling_at(30);
        let tally = cursor.tally();
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let delivery = session.drain(TICK).await.unwrap();
        assert_eq!(delivery.rows.len(), 30);
        assert_eq!(session.state(), StreamState::Fetching);

        assert!(session.cancel());
        assert!(!session.cancel());
        assert_eq!(session.state(), StreamState::Closed);

        assert_eq!(session.wait_closed().await, Some(CloseOutcome::Closed));
        assert_eq!(tally.closes(), 1);
        assert_eq!(tally.produced(), 30);

        assert!(session.drain(TICK).await.is_none());
        assert!(!session.request_more_rows());
        assert!(!session.needs_drain());
        assert!(logs_contain("Query cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_returns_before_a_hanging_close() {
        let cursor = ScriptedCursor::new(10).stalling_at(5).hanging_on_close();
        let tally = cursor.tally();
        let options = StreamOptions::default().with_close_wait_budget(Duration::from_millis(200));
        let session = IterationSession::start(cursor.boxed(), options).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(session.cancel());
        assert_eq!(session.wait_closed().await, Some(CloseOutcome::TimedOut));
        assert_eq!(tally.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_draining_discards_rows() {
        let cursor = ScriptedCursor::new(100).stalling_at(10);
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let drainer = {
            let session = session.clone();
            tokio::spawn(async move { session.drain(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.cancel());

        assert!(drainer.await.unwrap().is_none());
        assert_eq!(session.total_processed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_drain_is_rejected() {
        let cursor = ScriptedCursor::new(100).stalling_at(0);
        let session = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap();

        let drainer = {
            let session = session.clone();
            tokio::spawn(async move { session.drain(Duration::from_secs(1)).await })
        };
        tokio::task::yield_now().await;

        assert!(session.drain(TICK).await.is_none());

        let first = drainer.await.unwrap().unwrap();
        assert!(first.rows.is_empty());
        session.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn full_channel_blocks_the_worker() {
        let cursor = ScriptedCursor::new(20);
        let tally = cursor.tally();
        let options = StreamOptions::default().with_batch_limit(3);
        let session = IterationSession::start(cursor.boxed(), options).unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.pending_rows(), 3);

        // Second run fills the last slot and stalls on the fifth row.
        assert!(session.request_more_rows());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.state(), StreamState::Fetching);
        assert_eq!(session.pending_rows(), 4);
        assert_eq!(tally.produced(), 5);
        assert!(session.needs_drain());

        let delivery = session.drain(TICK).await.unwrap();
        assert_eq!(delivery.rows.len(), 6);
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.pending_rows(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_never_overlap() {
        let cursor = ScriptedCursor::new(60).with_row_delay(Duration::from_millis(1));
        let tally = cursor.tally();
        let options = StreamOptions::default().with_batch_limit(20);
        let session = IterationSession::start(cursor.boxed(), options).unwrap();

        for _ in 0..10 {
            assert!(!session.request_more_rows());
        }

        let mut delivered = 0;
        loop {
            let delivery = session.drain(TICK).await.unwrap();
            delivered += delivery.rows.len();
            if delivery.is_final() {
                break;
            }
            session.request_more_rows();
            session.request_more_rows();
        }

        assert_eq!(delivered, 60);
        assert_eq!(tally.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(session.metrics().snapshot().fetch_runs, 3);
    }

    #[tokio::test]
    async fn unreadable_metadata_creates_no_session() {
        let cursor = ScriptedCursor::new(5).with_broken_metadata();
        let err = IterationSession::start(cursor.boxed(), StreamOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::Metadata { .. }));
    }

    #[tokio::test]
    async fn invalid_options_are_rejected() {
        let err = IterationSession::start(
            ScriptedCursor::new(5).boxed(),
            StreamOptions::default().with_batch_limit(0),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidOptions(_)));
    }
}
