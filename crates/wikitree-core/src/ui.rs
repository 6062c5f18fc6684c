use crate::keybinds::InputMode;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Render the top bar: project identifier and the page being viewed.
pub fn render_title_bar(frame: &mut Frame, area: Rect, project: &str, page: Option<&str>) {
    let mut spans = vec![
        Span::styled(" wikitree ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("| ", Style::default().add_modifier(Modifier::DIM)),
        Span::raw(project.to_string()),
    ];
    if let Some(page) = page {
        spans.push(Span::styled(" / ", Style::default().add_modifier(Modifier::DIM)));
        spans.push(Span::styled(
            page.to_string(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the bottom status bar showing the current mode and key hints.
pub fn render_status_bar(frame: &mut Frame, area: Rect, mode: InputMode, label: &str, info: &str) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(" "),
        Span::styled(label.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(info.to_string(), Style::default().add_modifier(Modifier::DIM)),
    ]);

    let bar = Paragraph::new(line).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}

/// Standard layout: title bar (1 line) + main content + status bar (1 line).
/// Returns (title_area, content_area, status_area).
pub fn standard_layout(area: Rect) -> (Rect, Rect, Rect) {
    let [title_area, content_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(area);

    (title_area, content_area, status_area)
}
