use crate::{
    editor::{EditOp, Editor},
    grid::ResultGrid,
    scroll::ScrollPolicy,
};
use std::sync::Arc;
use stream_core::{
    Delivery, IterationSession, QueryError, QueryOutcome, RowCursor, SessionId, StreamOptions,
    UiEvent,
};
use tracing::{debug, info, warn};

/// Which pane receives plain key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Table,
}

impl Focus {
    fn toggle(self) -> Self {
        match self {
            Focus::Editor => Focus::Table,
            Focus::Table => Focus::Editor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Left,
    Right,
}

/// Everything that can happen to the browser.
#[derive(Debug)]
pub enum Message {
    Submit,
    Quit,
    Cancel,
    ToggleFocus,
    ClearEditor,
    Edit(EditOp),
    Navigate(Navigation),
    /// Rows available for the results table.
    Resize { table_rows: usize },
    Tick,
    Executed {
        query: u64,
        result: Result<QueryOutcome, QueryError>,
    },
    Delivered {
        session: SessionId,
        delivery: Option<Delivery>,
    },
}

/// Work the event loop performs on the controller's behalf.
pub enum Command {
    Execute { query: u64, text: String },
    Drain(Arc<IterationSession>),
    /// A cursor nobody wants any more; close it off the event loop.
    Discard(Box<dyn RowCursor>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Execute { query, text } => f
                .debug_struct("Execute")
                .field("query", query)
                .field("text", text)
                .finish(),
            Command::Drain(session) => f.debug_tuple("Drain").field(&session.id()).finish(),
            Command::Discard(_) => f.write_str("Discard"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Executing,
    Streaming,
    Done,
    Failed(String),
    Cancelled,
}

/// UI model of the browser.
///
/// Pure state machine: [`update`](Self::update) folds a message into the
/// model and returns commands. It never awaits, so the event loop stays
/// responsive whatever the cursor is doing.
#[derive(Debug)]
pub struct Controller {
    options: StreamOptions,
    editor: Editor,
    grid: ResultGrid,
    focus: Focus,
    status: Status,
    scroll: ScrollPolicy,
    session: Option<Arc<IterationSession>>,
    draining: bool,
    next_query: u64,
    pending_query: Option<u64>,
    spinner: usize,
    should_quit: bool,
}

impl Controller {
    pub fn new(options: StreamOptions) -> Self {
        Self {
            options,
            editor: Editor::default(),
            grid: ResultGrid::new(),
            focus: Focus::Editor,
            status: Status::Ready,
            scroll: ScrollPolicy::new(),
            session: None,
            draining: false,
            next_query: 0,
            pending_query: None,
            spinner: 0,
            should_quit: false,
        }
    }

    pub fn with_query(mut self, text: &str) -> Self {
        self.editor.set_text(text);
        self
    }

    pub fn update(&mut self, message: Message) -> Vec<Command> {
        let mut commands = Vec::new();

        match message {
            Message::Submit => self.submit(&mut commands),
            Message::Quit => {
                self.cancel_session();
                self.should_quit = true;
            }
            Message::Cancel => {
                // A statement still executing is abandoned; its result is
                // discarded when it arrives.
                let abandoned = self.pending_query.take().is_some();
                if self.cancel_session() || abandoned {
                    self.status = Status::Cancelled;
                }
            }
            Message::ToggleFocus => self.focus = self.focus.toggle(),
            Message::ClearEditor => self.editor.clear(),
            Message::Edit(op) => self.editor.apply(op),
            Message::Navigate(nav) => self.navigate(nav),
            Message::Resize { table_rows } => self.grid.set_height(table_rows),
            Message::Tick => {
                if self.is_busy() {
                    self.spinner = self.spinner.wrapping_add(1);
                }
            }
            Message::Executed { query, result } => self.on_executed(query, result, &mut commands),
            Message::Delivered { session, delivery } => {
                self.on_delivered(session, delivery, &mut commands)
            }
        }

        self.check_scroll(&mut commands);
        commands
    }

    fn submit(&mut self, commands: &mut Vec<Command>) {
        let text = self.editor.text().trim().to_string();
        if text.is_empty() {
            return;
        }

        // One active result at a time. The cancelled session closes on its own.
        self.cancel_session();
        self.session = None;

        let query = self.next_query;
        self.next_query += 1;
        self.pending_query = Some(query);
        self.status = Status::Executing;
        debug!(query, "Submitting statement");
        commands.push(Command::Execute { query, text });
    }

    fn on_executed(
        &mut self,
        query: u64,
        result: Result<QueryOutcome, QueryError>,
        commands: &mut Vec<Command>,
    ) {
        if self.pending_query != Some(query) {
            debug!(query, "Dropping result of superseded statement");
            if let Ok(QueryOutcome::Rows(cursor)) = result {
                commands.push(Command::Discard(cursor));
            }
            return;
        }
        self.pending_query = None;

        match result {
            Err(err) => self.fail(err.to_string()),
            Ok(QueryOutcome::Updated(count)) => {
                self.grid.show_message(format!("Affected Rows: {count}"), false);
                self.status = Status::Done;
            }
            Ok(QueryOutcome::Rows(cursor)) => match IterationSession::start(cursor, self.options) {
                Ok(session) => {
                    self.grid.reset(session.columns().clone());
                    self.scroll.reset();
                    self.status = Status::Streaming;
                    self.draining = true;
                    commands.push(Command::Drain(Arc::clone(&session)));
                    self.session = Some(session);
                }
                Err(err) => self.fail(err.to_string()),
            },
        }
    }

    fn on_delivered(
        &mut self,
        id: SessionId,
        delivery: Option<Delivery>,
        commands: &mut Vec<Command>,
    ) {
        let Some(session) = self.session.as_ref().filter(|s| s.id() == id).cloned() else {
            return;
        };
        self.draining = false;

        // A drain that completed before a cancel is stale once it lands.
        if session.is_closed() {
            debug!(session = %id, "Dropping delivery for a cancelled session");
            return;
        }

        // Nothing to show: a concurrent drain, or a cancel that raced us.
        let Some(delivery) = delivery else {
            return;
        };

        for event in delivery.into_events() {
            match event {
                UiEvent::Rows(rows) => self.grid.append(rows),
                UiEvent::StreamFinished { error } => {
                    let metrics = session.metrics().snapshot();
                    info!(
                        session = %id,
                        rows = session.total_processed(),
                        runs = metrics.fetch_runs,
                        drains = metrics.drains,
                        bytes = metrics.bytes_delivered,
                        "Result complete"
                    );
                    self.status = match error {
                        Some(error) => Status::Failed(error),
                        None => Status::Done,
                    };
                    return;
                }
            }
        }

        // Keep draining while rows are on their way. Once the worker has
        // paused on a full batch, the next drain waits for the user to scroll.
        self.schedule_drain(&session, commands);
    }

    fn navigate(&mut self, nav: Navigation) {
        match nav {
            Navigation::Up => self.grid.move_up(1),
            Navigation::Down => self.grid.move_down(1),
            Navigation::PageUp => self.grid.page_up(),
            Navigation::PageDown => self.grid.page_down(),
            Navigation::Top => self.grid.to_top(),
            Navigation::Bottom => self.grid.to_bottom(),
            Navigation::Left => self.grid.scroll_left(),
            Navigation::Right => self.grid.scroll_right(),
        }
    }

    /// Applies the scroll policy after every update.
    fn check_scroll(&mut self, commands: &mut Vec<Command>) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if session.is_closed() {
            return;
        }
        let viewport = self.grid.viewport();
        if !self
            .scroll
            .observe(viewport, session.total_processed(), session.is_finished())
        {
            return;
        }
        if session.request_more_rows() {
            debug!(session = %session.id(), edge = viewport.edge(), "Fetching more rows");
        }
        self.schedule_drain(&session, commands);
    }

    fn schedule_drain(&mut self, session: &Arc<IterationSession>, commands: &mut Vec<Command>) {
        if self.draining || !session.needs_drain() {
            return;
        }
        self.draining = true;
        commands.push(Command::Drain(Arc::clone(session)));
    }

    fn fail(&mut self, error: String) {
        warn!(%error, "Statement failed");
        self.grid.show_message(error.clone(), true);
        self.status = Status::Failed(error);
    }

    /// Cancels the active session, if it is still open.
    fn cancel_session(&mut self) -> bool {
        self.draining = false;
        match self.session.as_ref() {
            Some(session) => session.cancel(),
            None => false,
        }
    }

    /// Hands the last session to the caller, for a bounded close wait on exit.
    pub fn take_session(&mut self) -> Option<Arc<IterationSession>> {
        self.session.take()
    }

    pub fn session(&self) -> Option<&Arc<IterationSession>> {
        self.session.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_query.is_some() || self.status == Status::Streaming
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn grid(&self) -> &ResultGrid {
        &self.grid
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn spinner(&self) -> usize {
        self.spinner
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}
