#[cfg(test)]
mod tests {
    use browser::{Command, Controller, Message, controller::Navigation, controller::Status};
    use connectors::MemoryExecutor;
    use std::{sync::Arc, time::Duration};
    use stream_core::{QueryExecutor, StreamOptions};

    /// Plays the event loop: runs commands and feeds their results back
    /// until the controller has nothing left to do.
    async fn pump(controller: &mut Controller, executor: &MemoryExecutor, mut commands: Vec<Command>) {
        let deadline = Duration::from_millis(50);
        while let Some(command) = commands.pop() {
            let message = match command {
                Command::Execute { query, text } => Message::Executed {
                    query,
                    result: executor.execute(&text).await,
                },
                Command::Drain(session) => Message::Delivered {
                    session: session.id(),
                    delivery: session.drain(deadline).await,
                },
                Command::Discard(mut cursor) => {
                    cursor.close().await.unwrap();
                    continue;
                }
            };
            commands.extend(controller.update(message));
        }
    }

    fn browsing(table_rows: usize) -> Controller {
        let mut controller = Controller::new(StreamOptions::default());
        controller.update(Message::Resize { table_rows });
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn paging_to_the_end_loads_the_whole_table() {
        let executor = MemoryExecutor::demo();
        let mut controller = browsing(20).with_query("SELECT * FROM users");

        let commands = controller.update(Message::Submit);
        pump(&mut controller, &executor, commands).await;
        assert_eq!(controller.grid().len(), 50);

        controller.update(Message::ToggleFocus);
        for _ in 0..40 {
            let commands = controller.update(Message::Navigate(Navigation::PageDown));
            pump(&mut controller, &executor, commands).await;
        }

        assert_eq!(controller.grid().len(), 250);
        assert_eq!(controller.status(), &Status::Done);
        let session = controller.session().unwrap();
        assert!(session.is_end_delivered());
        assert_eq!(session.metrics().snapshot().fetch_runs, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_rows_are_shown_as_they_arrive() {
        let executor = MemoryExecutor::demo().with_row_latency(Duration::from_millis(5));
        let mut controller = browsing(20).with_query("SELECT * FROM events");

        let commands = controller.update(Message::Submit);
        pump(&mut controller, &executor, commands).await;

        // A 50 row batch takes 250ms against a 50ms drain budget, so it
        // arrives over several deliveries and then the stream waits.
        assert_eq!(controller.grid().len(), 50);
        assert_eq!(controller.status(), &Status::Streaming);
        let session = Arc::clone(controller.session().unwrap());
        assert!(session.metrics().snapshot().drains > 1);
        assert!(!session.needs_drain());
    }

    #[tokio::test(start_paused = true)]
    async fn quitting_cancels_an_endless_query() {
        let executor = MemoryExecutor::demo();
        let mut controller = browsing(10).with_query("SELECT * FROM ticks");

        let commands = controller.update(Message::Submit);
        pump(&mut controller, &executor, commands).await;
        let session = Arc::clone(controller.session().unwrap());

        assert!(controller.update(Message::Quit).is_empty());
        assert!(controller.should_quit());
        assert!(session.is_closed());
        assert!(controller.take_session().unwrap().wait_closed().await.is_some());
    }
}
