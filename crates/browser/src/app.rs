use crate::{
    controller::{Command, Controller, Message},
    error::BrowserError,
    keymap, render,
    theme::Theme,
};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{self, Stdout},
    sync::Arc,
    time::Duration,
};
use stream_core::{CloseOutcome, QueryExecutor, StreamOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct BrowserConfig {
    pub options: StreamOptions,
    pub no_color: bool,
    /// Text placed in the editor at startup.
    pub initial_query: Option<String>,
}

type Backend = CrosstermBackend<Stdout>;

/// Runs the interactive browser until the user quits or `shutdown` fires.
pub async fn run(
    executor: Arc<dyn QueryExecutor>,
    config: BrowserConfig,
    shutdown: CancellationToken,
) -> Result<(), BrowserError> {
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, executor, &config, shutdown).await;
    let restore_result = restore_terminal(&mut terminal);

    run_result?;
    restore_result
}

fn setup_terminal() -> Result<Terminal<Backend>, BrowserError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<(), BrowserError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_loop(
    terminal: &mut Terminal<Backend>,
    executor: Arc<dyn QueryExecutor>,
    config: &BrowserConfig,
    shutdown: CancellationToken,
) -> Result<(), BrowserError> {
    let theme = Theme::new(config.no_color);
    let mut controller = Controller::new(config.options);
    if let Some(query) = &config.initial_query {
        controller = controller.with_query(query);
    }

    let size = terminal.size()?;
    controller.update(Message::Resize {
        table_rows: render::table_rows(size.width, size.height),
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);

    info!("Browser started");

    while !controller.should_quit() {
        terminal.draw(|frame| render::draw(frame, &controller, &theme))?;

        let message = tokio::select! {
            _ = shutdown.cancelled() => Message::Quit,
            Some(message) = rx.recv() => message,
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match keymap::map_key_event(key, controller.focus()) {
                        Some(message) => message,
                        None => continue,
                    }
                }
                Some(Ok(Event::Resize(width, height))) => Message::Resize {
                    table_rows: render::table_rows(width, height),
                },
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
                None => Message::Quit,
            },
            _ = ticker.tick() => Message::Tick,
        };

        for command in controller.update(message) {
            dispatch(command, &executor, &tx, config.options.drain_deadline);
        }
    }

    // The session was cancelled on quit; give the close a bounded chance to
    // reach the server before the runtime goes away.
    if let Some(session) = controller.take_session() {
        match session.wait_closed().await {
            Some(CloseOutcome::TimedOut) => {
                warn!(session = %session.id(), "Cursor close still pending at exit")
            }
            outcome => debug!(session = %session.id(), ?outcome, "Session released"),
        }
    }
    info!("Browser stopped");
    Ok(())
}

/// Runs a command on its own task and feeds the result back as a message.
fn dispatch(
    command: Command,
    executor: &Arc<dyn QueryExecutor>,
    tx: &mpsc::UnboundedSender<Message>,
    drain_deadline: Duration,
) {
    let tx = tx.clone();
    match command {
        Command::Execute { query, text } => {
            let executor = Arc::clone(executor);
            tokio::spawn(async move {
                let result = executor.execute(&text).await;
                let _ = tx.send(Message::Executed { query, result });
            });
        }
        Command::Drain(session) => {
            tokio::spawn(async move {
                let delivery = session.drain(drain_deadline).await;
                let _ = tx.send(Message::Delivered {
                    session: session.id(),
                    delivery,
                });
            });
        }
        Command::Discard(mut cursor) => {
            tokio::spawn(async move {
                if let Err(err) = cursor.close().await {
                    warn!(error = %err, "Failed to close discarded cursor");
                }
            });
        }
    }
}
