use ratatui::style::{Color, Modifier, Style};

/// Styles used by the browser.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub header: Style,
    pub selected: Style,
    pub border: Style,
    pub focused_border: Style,
    pub error: Style,
    pub progress: Style,
    pub footer_key: Style,
    pub footer_text: Style,
}

impl Theme {
    pub fn colored() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            border: Style::default().fg(Color::DarkGray),
            focused_border: Style::default().fg(Color::Cyan),
            error: Style::default().fg(Color::Red),
            progress: Style::default().fg(Color::Green),
            footer_key: Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED),
            footer_text: Style::default().fg(Color::Gray),
        }
    }

    /// Attributes only, for terminals without color.
    pub fn plain() -> Self {
        Self {
            header: Style::default().add_modifier(Modifier::BOLD),
            selected: Style::default().add_modifier(Modifier::REVERSED),
            border: Style::default(),
            focused_border: Style::default().add_modifier(Modifier::BOLD),
            error: Style::default().add_modifier(Modifier::BOLD),
            progress: Style::default(),
            footer_key: Style::default().add_modifier(Modifier::REVERSED),
            footer_text: Style::default(),
        }
    }

    pub fn new(no_color: bool) -> Self {
        if no_color { Self::plain() } else { Self::colored() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_has_no_colors() {
        let theme = Theme::new(true);
        for style in [theme.header, theme.selected, theme.error, theme.progress] {
            assert_eq!(style.fg, None);
            assert_eq!(style.bg, None);
        }
    }
}
