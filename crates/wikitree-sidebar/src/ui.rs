use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::panel::SidebarPanel;
use crate::view::{ItemView, SidebarView};

/// Pixels per terminal column. Widths stay in pixels everywhere else.
pub const CELL_WIDTH_PX: u32 = 8;

/// Columns always left to the page content.
const MIN_CONTENT_COLS: u16 = 10;

const GUIDE_STYLE: Style = Style::new().fg(Color::DarkGray);
const SELECTED_BG: Color = Color::Gray;

pub fn px_to_cells(px: u32) -> u16 {
    (px / CELL_WIDTH_PX).min(u16::MAX as u32) as u16
}

pub fn cells_to_px(cells: u16) -> i64 {
    cells as i64 * CELL_WIDTH_PX as i64
}

/// Terminal width expressed in pixels, for the mobile breakpoint.
pub fn viewport_width_px(columns: u16) -> u32 {
    columns as u32 * CELL_WIDTH_PX
}

// ── Layout ───────────────────────────────────────────────────────────

/// Screen areas of a visible sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarAreas {
    pub block: Rect,
    pub title_row: Rect,
    pub expand_all: Rect,
    pub collapse_all: Rect,
    pub filter: Rect,
    pub tree: Rect,
    /// Right border column, dragged to resize.
    pub handle: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    /// `None` when no sidebar is shown.
    pub sidebar: Option<SidebarAreas>,
    pub content: Rect,
}

/// Width of the sidebar as drawn, in pixels. Matches the stored width
/// unless the area capped it.
pub fn drawn_width_px(areas: &SidebarAreas, view: &SidebarView) -> u32 {
    if areas.block.width == px_to_cells(view.width) {
        view.width
    } else {
        cells_to_px(areas.block.width) as u32
    }
}

/// Split `area` between the sidebar and the page content.
pub fn panel_layout(area: Rect, view: Option<&SidebarView>) -> PanelLayout {
    let Some(view) = view.filter(|view| !view.hidden) else {
        return PanelLayout {
            sidebar: None,
            content: area,
        };
    };

    let width = px_to_cells(view.width).min(area.width.saturating_sub(MIN_CONTENT_COLS));
    if width < 4 || area.height < 5 {
        return PanelLayout {
            sidebar: None,
            content: area,
        };
    }

    let block = Rect { width, ..area };
    let content = Rect {
        x: area.x + width,
        width: area.width - width,
        ..area
    };

    let inner = Block::default().borders(Borders::ALL).inner(block);
    let title_row = Rect { height: 1, ..inner };
    let collapse_all = Rect {
        x: inner.x + inner.width.saturating_sub(2),
        width: 2.min(inner.width),
        ..title_row
    };
    let expand_all = Rect {
        x: inner.x + inner.width.saturating_sub(4),
        width: 2.min(inner.width),
        ..title_row
    };
    let filter = Rect {
        y: inner.y + 1,
        height: 1,
        ..inner
    };
    let tree = Rect {
        y: inner.y + 2,
        height: inner.height.saturating_sub(2),
        ..inner
    };
    let handle = Rect {
        x: block.x + block.width - 1,
        width: 1,
        ..block
    };

    PanelLayout {
        sidebar: Some(SidebarAreas {
            block,
            title_row,
            expand_all,
            collapse_all,
            filter,
            tree,
            handle,
        }),
        content,
    }
}

/// First visible row so that `selected` stays on screen.
pub fn scroll_offset(selected: usize, visible_lines: usize) -> usize {
    if visible_lines > 0 && selected >= visible_lines {
        selected - visible_lines + 1
    } else {
        0
    }
}

/// Columns before an item's arrow.
pub fn indent_cells(item: &ItemView) -> u16 {
    px_to_cells(item.padding_left_px())
}

// ── Hit testing ──────────────────────────────────────────────────────

/// What lies under a mouse position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    ExpandAll,
    CollapseAll,
    Filter,
    ResizeHandle,
    /// The arrow of the n-th visible row.
    Toggle(usize),
    /// The link of the n-th visible row.
    Row(usize),
    /// Elsewhere inside the sidebar.
    Sidebar,
    Content,
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

pub fn hit_test(
    layout: &PanelLayout,
    view: &SidebarView,
    rows: &[usize],
    selected: usize,
    column: u16,
    row: u16,
) -> Hit {
    let Some(areas) = layout.sidebar else {
        return Hit::Content;
    };
    if !contains(areas.block, column, row) {
        return Hit::Content;
    }

    if contains(areas.handle, column, row) {
        return Hit::ResizeHandle;
    }
    if contains(areas.expand_all, column, row) {
        return Hit::ExpandAll;
    }
    if contains(areas.collapse_all, column, row) {
        return Hit::CollapseAll;
    }
    if contains(areas.filter, column, row) {
        return Hit::Filter;
    }
    if !contains(areas.tree, column, row) {
        return Hit::Sidebar;
    }

    let offset = scroll_offset(selected, areas.tree.height as usize);
    let position = offset + (row - areas.tree.y) as usize;
    let Some(&index) = rows.get(position) else {
        return Hit::Sidebar;
    };

    let item = &view.items[index];
    let arrow_x = areas.tree.x + indent_cells(item);
    if item.has_children() && column >= arrow_x && column < arrow_x + 2 {
        Hit::Toggle(position)
    } else {
        Hit::Row(position)
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Render the sidebar, if one is shown. Returns the area left for the page.
pub fn render_sidebar_panel(frame: &mut Frame, area: Rect, panel: &SidebarPanel) -> Rect {
    let Some(view) = panel.controller().view() else {
        return area;
    };
    let layout = panel_layout(area, Some(view));
    let Some(areas) = layout.sidebar else {
        return layout.content;
    };

    let border_color = if panel.is_focused() {
        Color::Blue
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    frame.render_widget(block, areas.block);

    render_title_row(frame, &areas, view);
    render_filter(frame, areas.filter, panel);
    render_rows(frame, areas.tree, view, panel);

    if panel.controller().is_resizing() {
        let grip = vec![Line::from("\u{2503}"); areas.handle.height as usize];
        frame.render_widget(
            Paragraph::new(grip).style(Style::default().fg(Color::Yellow)),
            areas.handle,
        );
    }

    layout.content
}

fn render_title_row(frame: &mut Frame, areas: &SidebarAreas, view: &SidebarView) {
    let title = Paragraph::new(Span::styled(
        view.title,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(title, areas.title_row);

    let button = Style::default().fg(Color::DarkGray);
    frame.render_widget(
        Paragraph::new(Span::styled("\u{25BC}", button)).alignment(Alignment::Center),
        areas.expand_all,
    );
    frame.render_widget(
        Paragraph::new(Span::styled("\u{25B6}", button)).alignment(Alignment::Center),
        areas.collapse_all,
    );
}

fn render_filter(frame: &mut Frame, area: Rect, panel: &SidebarPanel) {
    let text = panel.controller().filter_text();
    let prompt = Span::styled("/ ", Style::default().fg(Color::Yellow));

    let line = if text.is_empty() && !panel.is_filtering() {
        Line::from(vec![
            prompt,
            Span::styled(
                panel
                    .controller()
                    .view()
                    .map(|view| view.filter_placeholder)
                    .unwrap_or_default(),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from(vec![prompt, Span::raw(text.to_string())])
    };
    frame.render_widget(Paragraph::new(line), area);

    if panel.is_filtering() {
        let cursor_x = area.x + 2 + text[..panel.filter_cursor()].width() as u16;
        if cursor_x < area.x + area.width {
            frame.set_cursor_position((cursor_x, area.y));
        }
    }
}

fn render_rows(frame: &mut Frame, area: Rect, view: &SidebarView, panel: &SidebarPanel) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let rows = view.visible_rows();
    if rows.is_empty() {
        let message = if view.is_empty() {
            "  No wiki pages."
        } else {
            "  No matching pages."
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let visible_lines = area.height as usize;
    let offset = scroll_offset(panel.selected(), visible_lines);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_lines)
        .map(|(position, &index)| {
            let selected = panel.is_focused() && position == panel.selected();
            render_row(&view.items[index], selected, area.width)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_row(item: &ItemView, selected: bool, area_width: u16) -> Line<'static> {
    let base_style = if selected {
        Style::default()
            .bg(SELECTED_BG)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else if item.active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if item.has_children() {
        Style::default().fg(Color::Blue)
    } else {
        Style::default().fg(Color::White)
    };
    let guide_style = if selected {
        GUIDE_STYLE.bg(SELECTED_BG)
    } else {
        GUIDE_STYLE
    };

    let mut spans: Vec<Span<'static>> = vec![Span::styled(" ", base_style)];
    for _ in 0..item.depth {
        spans.push(Span::styled("\u{2502} ", guide_style));
    }

    let arrow = match (item.has_children(), item.toggle_expanded) {
        (false, _) => "  ",
        (true, true) => "\u{25BC} ",
        (true, false) => "\u{25B6} ",
    };
    spans.push(Span::styled(arrow, base_style));
    spans.push(Span::styled(format!("{} ", item.icon.glyph()), base_style));
    spans.push(Span::styled(item.title.clone(), base_style));

    if selected {
        let content_width: usize = spans.iter().map(|s| s.content.width()).sum();
        let remaining = (area_width as usize).saturating_sub(content_width);
        if remaining > 0 {
            spans.push(Span::styled(
                " ".repeat(remaining),
                Style::default().bg(SELECTED_BG),
            ));
        }
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikitree_core::state::ClientState;
    use wikitree_core::tree::PageNode;

    fn view() -> SidebarView {
        let pages = vec![PageNode {
            title: "Guide".into(),
            slug: "guide".into(),
            url: "/guide".into(),
            children: vec![PageNode {
                title: "Setup".into(),
                slug: "setup".into(),
                url: "/setup".into(),
                children: vec![],
            }],
        }];
        let mut state = ClientState::default();
        state.set_expanded("guide", true);
        SidebarView::build(&pages, &state, None)
    }

    #[test]
    fn test_width_converts_to_cells() {
        assert_eq!(px_to_cells(280), 35);
        assert_eq!(px_to_cells(200), 25);
        assert_eq!(viewport_width_px(96), 768);
        assert_eq!(cells_to_px(3), 24);
    }

    #[test]
    fn test_layout_without_sidebar() {
        let area = Rect::new(0, 0, 120, 40);
        assert_eq!(panel_layout(area, None).content, area);

        let mut hidden = view();
        hidden.hidden = true;
        assert!(panel_layout(area, Some(&hidden)).sidebar.is_none());
    }

    #[test]
    fn test_layout_splits_area() {
        let area = Rect::new(0, 1, 120, 40);
        let layout = panel_layout(area, Some(&view()));
        let sidebar = layout.sidebar.unwrap();

        assert_eq!(sidebar.block.width, 35);
        assert_eq!(layout.content.x, 35);
        assert_eq!(layout.content.width, 85);
        assert_eq!(sidebar.handle.x, 34);
        assert_eq!(sidebar.tree.y, 4);
    }

    #[test]
    fn test_drawn_width_follows_cap() {
        let view = view();
        let wide = panel_layout(Rect::new(0, 0, 120, 40), Some(&view));
        assert_eq!(drawn_width_px(&wide.sidebar.unwrap(), &view), 280);

        let narrow = panel_layout(Rect::new(0, 0, 40, 40), Some(&view));
        assert_eq!(drawn_width_px(&narrow.sidebar.unwrap(), &view), 240);
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(3, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(5, 0), 0);
    }

    #[test]
    fn test_hit_test() {
        let view = view();
        let rows = view.visible_rows();
        let layout = panel_layout(Rect::new(0, 0, 120, 40), Some(&view));
        let tree = layout.sidebar.unwrap().tree;

        // Root arrow starts one column in, after the 12 px padding.
        assert_eq!(hit_test(&layout, &view, &rows, 0, tree.x + 1, tree.y), Hit::Toggle(0));
        assert_eq!(hit_test(&layout, &view, &rows, 0, tree.x + 6, tree.y), Hit::Row(0));
        // Leaves have no arrow.
        assert_eq!(hit_test(&layout, &view, &rows, 0, tree.x + 3, tree.y + 1), Hit::Row(1));
        assert_eq!(hit_test(&layout, &view, &rows, 0, tree.x + 3, tree.y + 5), Hit::Sidebar);
        assert_eq!(hit_test(&layout, &view, &rows, 0, 34, 10), Hit::ResizeHandle);
        assert_eq!(hit_test(&layout, &view, &rows, 0, 60, 10), Hit::Content);
    }
}
