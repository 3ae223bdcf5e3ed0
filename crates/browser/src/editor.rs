/// Editing operations of the query editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    Newline,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

/// Multi-line text input holding the query being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    lines: Vec<String>,
    row: usize,
    /// Cursor column in characters.
    col: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl Editor {
    pub fn with_text(text: &str) -> Self {
        let mut editor = Self::default();
        editor.set_text(text);
        editor
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = self.lines.len() - 1;
        self.col = self.current().chars().count();
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Cursor as (column, row).
    pub fn cursor(&self) -> (usize, usize) {
        (self.col, self.row)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, op: EditOp) {
        match op {
            EditOp::Insert(c) => {
                let at = self.byte_index();
                self.lines[self.row].insert(at, c);
                self.col += 1;
            }
            EditOp::Newline => {
                let at = self.byte_index();
                let rest = self.lines[self.row].split_off(at);
                self.row += 1;
                self.lines.insert(self.row, rest);
                self.col = 0;
            }
            EditOp::Backspace => {
                if self.col > 0 {
                    self.col -= 1;
                    let at = self.byte_index();
                    self.lines[self.row].remove(at);
                } else if self.row > 0 {
                    let line = self.lines.remove(self.row);
                    self.row -= 1;
                    self.col = self.current().chars().count();
                    self.lines[self.row].push_str(&line);
                }
            }
            EditOp::Delete => {
                if self.col < self.current().chars().count() {
                    let at = self.byte_index();
                    self.lines[self.row].remove(at);
                } else if self.row + 1 < self.lines.len() {
                    let next = self.lines.remove(self.row + 1);
                    self.lines[self.row].push_str(&next);
                }
            }
            EditOp::Left => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = self.current().chars().count();
                }
            }
            EditOp::Right => {
                if self.col < self.current().chars().count() {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
            }
            EditOp::Up => {
                if self.row > 0 {
                    self.row -= 1;
                    self.clamp_col();
                }
            }
            EditOp::Down => {
                if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.clamp_col();
                }
            }
            EditOp::Home => self.col = 0,
            EditOp::End => self.col = self.current().chars().count(),
        }
    }

    fn current(&self) -> &str {
        &self.lines[self.row]
    }

    fn clamp_col(&mut self) {
        self.col = self.col.min(self.current().chars().count());
    }

    fn byte_index(&self) -> usize {
        self.current()
            .char_indices()
            .nth(self.col)
            .map(|(i, _)| i)
            .unwrap_or(self.current().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(editor: &mut Editor, text: &str) {
        for c in text.chars() {
            editor.apply(if c == '\n' { EditOp::Newline } else { EditOp::Insert(c) });
        }
    }

    #[test]
    fn typing_builds_multiline_text() {
        let mut editor = Editor::default();
        type_text(&mut editor, "SELECT *\nFROM users");
        assert_eq!(editor.text(), "SELECT *\nFROM users");
        assert_eq!(editor.cursor(), (10, 1));
    }

    #[test]
    fn backspace_joins_lines() {
        let mut editor = Editor::with_text("ab\ncd");
        editor.apply(EditOp::Home);
        editor.apply(EditOp::Backspace);
        assert_eq!(editor.text(), "abcd");
        assert_eq!(editor.cursor(), (2, 0));
    }

    #[test]
    fn edits_respect_multibyte_chars() {
        let mut editor = Editor::with_text("héllo");
        editor.apply(EditOp::Left);
        editor.apply(EditOp::Left);
        editor.apply(EditOp::Left);
        editor.apply(EditOp::Backspace);
        assert_eq!(editor.text(), "hllo");
        editor.apply(EditOp::Delete);
        assert_eq!(editor.text(), "hlo");
    }

    #[test]
    fn vertical_moves_clamp_column() {
        let mut editor = Editor::with_text("long line\nab");
        editor.apply(EditOp::Up);
        editor.apply(EditOp::End);
        editor.apply(EditOp::Down);
        assert_eq!(editor.cursor(), (2, 1));
    }

    #[test]
    fn clear_resets() {
        let mut editor = Editor::with_text("SELECT 1");
        editor.clear();
        assert_eq!(editor.text(), "");
        assert_eq!(editor.cursor(), (0, 0));
    }
}
