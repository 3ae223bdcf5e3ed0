use crate::scroll::Viewport;
use model::{ColumnMetadata, Row, RowBatch};

const MAX_COLUMN_WIDTH: usize = 40;

/// What the results area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridContent {
    Empty,
    Table,
    /// Plain text in place of a table: an update count or an error.
    Message { text: String, is_error: bool },
}

/// Rows received so far plus the cursor and scroll position over them.
///
/// Values are rendered to text once, on arrival.
#[derive(Debug)]
pub struct ResultGrid {
    content: GridContent,
    columns: ColumnMetadata,
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
    selected: usize,
    top: usize,
    height: usize,
    column_offset: usize,
}

impl Default for ResultGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultGrid {
    pub fn new() -> Self {
        Self {
            content: GridContent::Empty,
            columns: ColumnMetadata::default(),
            rows: Vec::new(),
            widths: Vec::new(),
            selected: 0,
            top: 0,
            height: 1,
            column_offset: 0,
        }
    }

    /// Clears the grid for a new result with `columns`.
    pub fn reset(&mut self, columns: ColumnMetadata) {
        self.widths = columns.iter().map(|c| c.chars().count().min(MAX_COLUMN_WIDTH)).collect();
        self.columns = columns;
        self.rows.clear();
        self.selected = 0;
        self.top = 0;
        self.column_offset = 0;
        self.content = GridContent::Table;
    }

    pub fn show_message(&mut self, text: impl Into<String>, is_error: bool) {
        self.reset(ColumnMetadata::default());
        self.content = GridContent::Message {
            text: text.into(),
            is_error,
        };
    }

    pub fn append(&mut self, batch: RowBatch) {
        self.rows.reserve(batch.len());
        for row in batch {
            self.push(row);
        }
    }

    fn push(&mut self, row: Row) {
        let cells: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
        for (width, cell) in self.widths.iter_mut().zip(&cells) {
            *width = (*width).max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
        }
        self.rows.push(cells);
    }

    pub fn content(&self) -> &GridContent {
        &self.content
    }

    pub fn columns(&self) -> &ColumnMetadata {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn column_offset(&self) -> usize {
        self.column_offset
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.follow_selection();
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            top_offset: self.top,
            cursor_row: self.selected - self.top,
            height: self.height,
        }
    }

    /// Rows currently on screen with their absolute index.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(self.top)
            .take(self.height)
            .map(|(i, cells)| (i, cells.as_slice()))
    }

    pub fn move_down(&mut self, by: usize) {
        let last = self.rows.len().saturating_sub(1);
        self.selected = (self.selected + by).min(last);
        self.follow_selection();
    }

    pub fn move_up(&mut self, by: usize) {
        self.selected = self.selected.saturating_sub(by);
        self.follow_selection();
    }

    pub fn page_down(&mut self) {
        self.move_down(self.height);
    }

    pub fn page_up(&mut self) {
        self.move_up(self.height);
    }

    pub fn to_top(&mut self) {
        self.move_up(self.selected);
    }

    pub fn to_bottom(&mut self) {
        self.move_down(self.rows.len());
    }

    pub fn scroll_left(&mut self) {
        self.column_offset = self.column_offset.saturating_sub(1);
    }

    pub fn scroll_right(&mut self) {
        if self.column_offset + 1 < self.columns.len() {
            self.column_offset += 1;
        }
    }

    fn follow_selection(&mut self) {
        if self.selected < self.top {
            self.top = self.selected;
        } else if self.selected >= self.top + self.height {
            self.top = self.selected + 1 - self.height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Value;

    fn grid_with(rows: usize, height: usize) -> ResultGrid {
        let mut grid = ResultGrid::new();
        grid.reset(ColumnMetadata::new(["id", "name"]));
        grid.set_height(height);
        grid.append(
            (0..rows)
                .map(|i| Row::new(vec![Value::Int(i as i64), Value::from(format!("n{i}"))]))
                .collect::<Vec<_>>()
                .into(),
        );
        grid
    }

    #[test]
    fn cursor_scrolls_the_window() {
        let mut grid = grid_with(50, 10);
        grid.move_down(9);
        assert_eq!(grid.viewport(), Viewport { top_offset: 0, cursor_row: 9, height: 10 });

        grid.move_down(1);
        assert_eq!(grid.viewport().top_offset, 1);
        assert_eq!(grid.viewport().edge(), 10);

        grid.page_down();
        assert_eq!(grid.selected(), 20);
        grid.to_bottom();
        assert_eq!(grid.selected(), 49);
        assert_eq!(grid.viewport().top_offset, 40);

        grid.to_top();
        assert_eq!(grid.viewport(), Viewport { top_offset: 0, cursor_row: 0, height: 10 });
    }

    #[test]
    fn visible_rows_follow_the_window() {
        let mut grid = grid_with(30, 5);
        grid.move_down(12);
        let visible: Vec<usize> = grid.visible_rows().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn widths_grow_with_content_up_to_a_cap() {
        let mut grid = grid_with(0, 5);
        grid.append(
            vec![Row::new(vec![Value::Int(123456), Value::from("x".repeat(100))])].into(),
        );
        assert_eq!(grid.widths(), &[6, MAX_COLUMN_WIDTH]);
    }

    #[test]
    fn message_replaces_table() {
        let mut grid = grid_with(3, 5);
        grid.show_message("Affected Rows: 3", false);
        assert!(grid.is_empty());
        assert_eq!(
            grid.content(),
            &GridContent::Message { text: "Affected Rows: 3".into(), is_error: false }
        );
    }

    #[test]
    fn horizontal_scroll_stays_in_range() {
        let mut grid = grid_with(1, 5);
        grid.scroll_left();
        assert_eq!(grid.column_offset(), 0);
        grid.scroll_right();
        grid.scroll_right();
        assert_eq!(grid.column_offset(), 1);
    }
}
