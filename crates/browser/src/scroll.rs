/// Position of the visible window over the loaded rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    /// Index of the first row on screen.
    pub top_offset: usize,
    /// Rows between the top of the window and the cursor.
    pub cursor_row: usize,
    /// Rows that fit on screen.
    pub height: usize,
}

impl Viewport {
    /// Row offset nearest the bottom of what the user is looking at.
    pub fn edge(&self) -> usize {
        self.top_offset + self.cursor_row
    }
}

/// Decides when the user has scrolled close enough to the last loaded row
/// that another fetch run is due.
///
/// Rows are fetched only as fast as the user moves towards them, so memory
/// is bounded by how far the user scrolls rather than by result size.
#[derive(Debug, Default)]
pub struct ScrollPolicy {
    last_edge: usize,
}

impl ScrollPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current viewport and returns whether more rows should be
    /// requested: the edge moved down since the last call, it is within one
    /// screen of `total_processed`, and the stream is not finished.
    pub fn observe(&mut self, viewport: Viewport, total_processed: usize, finished: bool) -> bool {
        let edge = viewport.edge();
        let grew = edge > self.last_edge;
        self.last_edge = edge;

        grew && !finished && edge + viewport.height > total_processed
    }

    /// Forgets the previous edge, for a new result.
    pub fn reset(&mut self) {
        self.last_edge = 0;
    }
}
