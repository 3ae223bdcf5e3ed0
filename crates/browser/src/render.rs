use crate::{
    controller::{Controller, Focus, Status},
    grid::{GridContent, ResultGrid},
    keymap::SHORTCUTS,
    theme::Theme,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

const EDITOR_HEIGHT: u16 = 7;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(crate) struct Areas {
    pub table: Rect,
    pub separator: Rect,
    pub editor: Rect,
    pub footer: Rect,
}

pub(crate) fn split(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(1),
            Constraint::Length(EDITOR_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    Areas {
        table: chunks[0],
        separator: chunks[1],
        editor: chunks[2],
        footer: chunks[3],
    }
}

/// Data rows that fit in the results table of a terminal of this size:
/// the table area minus its border and header line.
pub(crate) fn table_rows(width: u16, height: u16) -> usize {
    let areas = split(Rect::new(0, 0, width, height));
    usize::from(areas.table.height.saturating_sub(3))
}

pub(crate) fn draw(frame: &mut Frame<'_>, controller: &Controller, theme: &Theme) {
    let areas = split(frame.area());
    let focus = controller.focus();

    render_results(frame, areas.table, controller.grid(), focus == Focus::Table, theme);
    render_separator(frame, areas.separator, controller, theme);
    render_editor(frame, areas.editor, controller, focus == Focus::Editor, theme);
    render_footer(frame, areas.footer, theme);
}

fn block<'a>(title: &'a str, focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            theme.focused_border
        } else {
            theme.border
        })
}

fn render_results(frame: &mut Frame<'_>, area: Rect, grid: &ResultGrid, focused: bool, theme: &Theme) {
    let block = block("Results", focused, theme);

    match grid.content() {
        GridContent::Empty => frame.render_widget(block, area),
        GridContent::Message { text, is_error } => {
            let style = if *is_error { theme.error } else { Default::default() };
            let message = Paragraph::new(Span::styled(text.as_str(), style))
                .wrap(Wrap { trim: false })
                .block(block);
            frame.render_widget(message, area);
        }
        GridContent::Table => {
            let skip = grid.column_offset();
            let header = Row::new(grid.columns().iter().skip(skip).map(Cell::from)).style(theme.header);
            let widths: Vec<Constraint> = grid
                .widths()
                .iter()
                .skip(skip)
                .map(|w| Constraint::Length(*w as u16))
                .collect();

            let rows = grid.visible_rows().map(|(index, cells)| {
                let row = Row::new(cells.iter().skip(skip).map(|c| Cell::from(c.as_str())));
                if index == grid.selected() && focused {
                    row.style(theme.selected)
                } else {
                    row
                }
            });

            let table = Table::new(rows, widths).header(header).block(block);
            frame.render_widget(table, area);
        }
    }
}

fn render_separator(frame: &mut Frame<'_>, area: Rect, controller: &Controller, theme: &Theme) {
    let rows = controller.grid().len();
    let mut spans = Vec::new();

    if controller.is_busy() {
        let frame_index = controller.spinner() % SPINNER.len();
        spans.push(Span::styled(format!(" {} ", SPINNER[frame_index]), theme.progress));
    } else {
        spans.push(Span::raw("── "));
    }

    match controller.status() {
        Status::Ready => {}
        Status::Executing => spans.push(Span::raw("executing ")),
        Status::Streaming => spans.push(Span::raw(format!("{rows} rows loaded "))),
        Status::Done => spans.push(Span::raw(format!("{rows} rows "))),
        Status::Cancelled => spans.push(Span::raw(format!("cancelled after {rows} rows "))),
        Status::Failed(error) => {
            if rows > 0 {
                spans.push(Span::raw(format!("{rows} rows ")));
            }
            spans.push(Span::styled(format!("error: {error} "), theme.error));
        }
    }

    if let Some(session) = controller.session() {
        let metrics = session.metrics().snapshot();
        if metrics.fetch_runs > 0 {
            spans.push(Span::styled(
                format!("[{} fetches, {} drains] ", metrics.fetch_runs, metrics.drains),
                theme.border,
            ));
        }
    }

    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let fill = usize::from(area.width).saturating_sub(used);
    spans.push(Span::styled("─".repeat(fill), theme.border));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_editor(frame: &mut Frame<'_>, area: Rect, controller: &Controller, focused: bool, theme: &Theme) {
    let editor = controller.editor();
    let (col, row) = editor.cursor();
    let inner_height = usize::from(area.height.saturating_sub(2)).max(1);
    let scroll = row.saturating_sub(inner_height - 1);

    let lines: Vec<Line> = editor.lines().iter().map(|l| Line::raw(l.as_str())).collect();
    let paragraph = Paragraph::new(lines)
        .scroll((scroll as u16, 0))
        .block(block("Query", focused, theme));
    frame.render_widget(paragraph, area);

    if focused {
        let x = area.x + 1 + col as u16;
        let y = area.y + 1 + (row - scroll) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), y));
    }
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let mut spans = Vec::with_capacity(SHORTCUTS.len() * 3);
    for (key, description) in SHORTCUTS {
        spans.push(Span::styled(format!(" {key} "), theme.footer_key));
        spans.push(Span::styled(format!(" {description}"), theme.footer_text));
        spans.push(Span::raw("    "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
