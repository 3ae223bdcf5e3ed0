use crate::{
    controller::{Focus, Message, Navigation},
    editor::EditOp,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Shortcuts shown in the footer.
pub const SHORTCUTS: [(&str, &str); 5] = [
    ("^E", "execute"),
    ("^Q", "quit"),
    ("Tab", "toggle focus"),
    ("^C", "cancel query"),
    ("^U", "clear query"),
];

/// Maps a key press to a message. Global shortcuts work in both panes; other
/// keys go to whichever pane has focus.
pub fn map_key_event(key: KeyEvent, focus: Focus) -> Option<Message> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('e') => Some(Message::Submit),
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('c') => Some(Message::Cancel),
            KeyCode::Char('u') => Some(Message::ClearEditor),
            _ => None,
        };
    }
    if key.code == KeyCode::Tab {
        return Some(Message::ToggleFocus);
    }

    match focus {
        Focus::Table => map_table_key(key.code).map(Message::Navigate),
        Focus::Editor => map_editor_key(key.code).map(Message::Edit),
    }
}

fn map_table_key(code: KeyCode) -> Option<Navigation> {
    match code {
        KeyCode::Down | KeyCode::Char('j') => Some(Navigation::Down),
        KeyCode::Up | KeyCode::Char('k') => Some(Navigation::Up),
        KeyCode::PageDown => Some(Navigation::PageDown),
        KeyCode::PageUp => Some(Navigation::PageUp),
        KeyCode::Home | KeyCode::Char('g') => Some(Navigation::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Navigation::Bottom),
        KeyCode::Left | KeyCode::Char('a') => Some(Navigation::Left),
        KeyCode::Right | KeyCode::Char('d') => Some(Navigation::Right),
        _ => None,
    }
}

fn map_editor_key(code: KeyCode) -> Option<EditOp> {
    match code {
        KeyCode::Char(c) => Some(EditOp::Insert(c)),
        KeyCode::Enter => Some(EditOp::Newline),
        KeyCode::Backspace => Some(EditOp::Backspace),
        KeyCode::Delete => Some(EditOp::Delete),
        KeyCode::Left => Some(EditOp::Left),
        KeyCode::Right => Some(EditOp::Right),
        KeyCode::Up => Some(EditOp::Up),
        KeyCode::Down => Some(EditOp::Down),
        KeyCode::Home => Some(EditOp::Home),
        KeyCode::End => Some(EditOp::End),
        _ => None,
    }
}
