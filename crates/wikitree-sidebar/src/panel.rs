use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use wikitree_core::keybinds::{Action, InputMode, KeyState, process_normal_key};

use crate::controller::SidebarController;
use crate::ui::{Hit, cells_to_px, drawn_width_px, hit_test, panel_layout};

/// Width change of one `<` / `>` press, in pixels.
pub const WIDTH_STEP_PX: i64 = 16;

/// Rows moved by Ctrl-d / Ctrl-u.
const HALF_PAGE: usize = 10;

/// Keyboard and mouse front end of a [`SidebarController`].
pub struct SidebarPanel {
    controller: SidebarController,
    /// Position in the visible rows.
    selected: usize,
    mode: InputMode,
    key_state: KeyState,
    /// Byte offset into the filter text.
    filter_cursor: usize,
    focused: bool,
}

impl SidebarPanel {
    pub fn new(controller: SidebarController) -> Self {
        Self {
            controller,
            selected: 0,
            mode: InputMode::Normal,
            key_state: KeyState::default(),
            filter_cursor: 0,
            focused: true,
        }
    }

    pub fn controller(&self) -> &SidebarController {
        &self.controller
    }

    pub fn into_controller(self) -> SidebarController {
        self.controller
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_filtering(&self) -> bool {
        self.mode == InputMode::Insert
    }

    pub fn filter_cursor(&self) -> usize {
        self.filter_cursor
    }

    /// Whether key presses go to the tree rather than the page.
    pub fn is_focused(&self) -> bool {
        self.focused && self.is_shown()
    }

    /// Rendered and not hidden.
    pub fn is_shown(&self) -> bool {
        self.controller.view().is_some_and(|view| !view.hidden)
    }

    /// Slug of the selected row.
    pub fn selected_slug(&self) -> Option<&str> {
        let view = self.controller.view()?;
        let rows = view.visible_rows();
        rows.get(self.selected)
            .map(|&index| view.items[index].slug.as_str())
    }

    /// Poll the fetch; once the sidebar appears, select the current page.
    pub fn tick(&mut self) -> bool {
        if !self.controller.tick() {
            return false;
        }
        if let Some(view) = self.controller.view() {
            self.selected = view
                .visible_rows()
                .iter()
                .position(|&index| view.items[index].active)
                .unwrap_or(0);
        }
        true
    }

    // ── Selection ────────────────────────────────────────────────────

    fn row_count(&self) -> usize {
        self.controller
            .view()
            .map(|view| view.visible_rows().len())
            .unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.row_count().saturating_sub(1));
    }

    /// Run a tree mutation, keeping the cursor on the same page when it
    /// stays visible.
    fn keep_selection(&mut self, mutate: impl FnOnce(&mut SidebarController)) {
        let slug = self.selected_slug().map(str::to_string);
        mutate(&mut self.controller);
        if let (Some(slug), Some(view)) = (slug, self.controller.view()) {
            let rows = view.visible_rows();
            if let Some(position) = rows.iter().position(|&index| view.items[index].slug == slug) {
                self.selected = position;
                return;
            }
        }
        self.clamp_selection();
    }

    fn move_down(&mut self, count: usize) {
        self.selected = (self.selected + count).min(self.row_count().saturating_sub(1));
    }

    fn move_up(&mut self, count: usize) {
        self.selected = self.selected.saturating_sub(count);
    }

    fn toggle_selected(&mut self) {
        let Some(slug) = self.selected_slug().map(str::to_string) else {
            return;
        };
        let has_children = self
            .controller
            .view()
            .and_then(|view| view.item(&slug))
            .is_some_and(|item| item.has_children());
        if has_children {
            self.keep_selection(|controller| {
                controller.toggle_node(&slug);
            });
        }
    }

    /// Expand the selected node when it is drawn collapsed.
    fn expand_selected(&mut self) {
        let collapsed = self
            .selected_item_flags()
            .is_some_and(|(has_children, collapsed)| has_children && collapsed);
        if collapsed {
            self.toggle_selected();
        }
    }

    /// Collapse the selected node, or move to its parent.
    fn collapse_selected(&mut self) {
        let Some((has_children, collapsed)) = self.selected_item_flags() else {
            return;
        };
        if has_children && !collapsed {
            self.toggle_selected();
            return;
        }

        let Some(view) = self.controller.view() else {
            return;
        };
        let rows = view.visible_rows();
        let parent = rows
            .get(self.selected)
            .and_then(|&index| view.items[index].parent);
        if let Some(parent) = parent {
            if let Some(position) = rows.iter().position(|&index| index == parent) {
                self.selected = position;
            }
        }
    }

    /// `(has_children, children_collapsed)` of the selected row.
    fn selected_item_flags(&self) -> Option<(bool, bool)> {
        let slug = self.selected_slug()?;
        let item = self.controller.view()?.item(slug)?;
        Some((item.has_children(), item.children_collapsed))
    }

    // ── Filter input ─────────────────────────────────────────────────

    fn start_filter(&mut self) -> Action {
        self.mode = InputMode::Insert;
        self.filter_cursor = self.controller.filter_text().len();
        Action::SetMode(InputMode::Insert)
    }

    fn edit_filter(&mut self, edit: impl FnOnce(&mut String, &mut usize)) {
        let mut text = self.controller.filter_text().to_string();
        let mut cursor = self.filter_cursor.min(text.len());
        edit(&mut text, &mut cursor);
        self.filter_cursor = cursor;
        self.controller.set_filter_text(&text);
        self.selected = 0;
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.edit_filter(|text, cursor| {
                    text.clear();
                    *cursor = 0;
                });
                self.mode = InputMode::Normal;
                Action::SetMode(InputMode::Normal)
            }
            KeyCode::Enter => {
                self.mode = InputMode::Normal;
                Action::SetMode(InputMode::Normal)
            }
            KeyCode::Char(c) => {
                self.edit_filter(|text, cursor| {
                    text.insert(*cursor, c);
                    *cursor += c.len_utf8();
                });
                Action::None
            }
            KeyCode::Backspace => {
                self.edit_filter(|text, cursor| {
                    if let Some((prev, _)) = text[..*cursor].char_indices().next_back() {
                        text.drain(prev..*cursor);
                        *cursor = prev;
                    }
                });
                Action::None
            }
            KeyCode::Left => {
                let text = self.controller.filter_text();
                self.filter_cursor = text[..self.filter_cursor.min(text.len())]
                    .char_indices()
                    .next_back()
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                Action::None
            }
            KeyCode::Right => {
                let text = self.controller.filter_text();
                if self.filter_cursor < text.len() {
                    self.filter_cursor = text[self.filter_cursor..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.filter_cursor + i)
                        .unwrap_or(text.len());
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Typed or pasted text goes into the filter while it is being edited.
    pub fn handle_paste(&mut self, pasted: &str) {
        if !self.is_filtering() {
            return;
        }
        self.edit_filter(|text, cursor| {
            for c in pasted.chars().filter(|c| !c.is_control()) {
                text.insert(*cursor, c);
                *cursor += c.len_utf8();
            }
        });
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// Handle a key. Anything the sidebar does not consume is returned for
    /// the host page.
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if self.is_filtering() {
            return self.handle_filter_key(key);
        }

        let action = process_normal_key(key, &mut self.key_state);

        if let Action::LeaderSequence('e') = action {
            self.toggle_visibility();
            return Action::None;
        }

        if !self.is_focused() {
            return action;
        }

        match action {
            Action::MoveDown(n) => self.move_down(n),
            Action::MoveUp(n) => self.move_up(n),
            Action::GotoTop => self.selected = 0,
            Action::GotoBottom => self.selected = self.row_count().saturating_sub(1),
            Action::HalfPageDown => self.move_down(HALF_PAGE),
            Action::HalfPageUp => self.move_up(HALF_PAGE),
            Action::Expand => self.expand_selected(),
            Action::Collapse => self.collapse_selected(),
            Action::ToggleNode => self.toggle_selected(),
            Action::ExpandAll => self.keep_selection(SidebarController::expand_all),
            Action::CollapseAll => self.keep_selection(SidebarController::collapse_all),
            Action::Widen => {
                self.controller.nudge_width(WIDTH_STEP_PX);
            }
            Action::Narrow => {
                self.controller.nudge_width(-WIDTH_STEP_PX);
            }
            Action::Search => return self.start_filter(),
            Action::Confirm => {
                return self
                    .selected_slug()
                    .map(|slug| Action::OpenPage(slug.to_string()))
                    .unwrap_or(Action::None);
            }
            other => return other,
        }
        Action::None
    }

    /// Show or hide the sidebar. Focus follows it.
    pub fn toggle_visibility(&mut self) {
        self.focused = self.controller.toggle_visibility();
    }

    /// Move key focus between the tree and the page.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    // ── Mouse ────────────────────────────────────────────────────────

    /// Handle a mouse event over `area`, the region shared by the sidebar
    /// and the page.
    pub fn handle_mouse(&mut self, event: MouseEvent, area: Rect) -> Action {
        let x_px = cells_to_px(event.column);

        match event.kind {
            MouseEventKind::Drag(MouseButton::Left) if self.controller.is_resizing() => {
                self.controller.drag_resize(x_px);
                return Action::None;
            }
            MouseEventKind::Up(MouseButton::Left) if self.controller.is_resizing() => {
                self.controller.end_resize();
                return Action::None;
            }
            _ => {}
        }

        let Some(view) = self.controller.view() else {
            return Action::None;
        };
        let layout = panel_layout(area, Some(view));
        let rows = view.visible_rows();
        let hit = hit_test(&layout, view, &rows, self.selected, event.column, event.row);
        let drawn_width = layout
            .sidebar
            .as_ref()
            .map_or(view.width, |areas| drawn_width_px(areas, view));

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(hit, x_px, drawn_width),
            MouseEventKind::ScrollDown if hit != Hit::Content => {
                self.move_down(1);
                Action::None
            }
            MouseEventKind::ScrollUp if hit != Hit::Content => {
                self.move_up(1);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn click(&mut self, hit: Hit, x_px: i64, drawn_width: u32) -> Action {
        if hit != Hit::Content {
            self.focused = true;
        }

        match hit {
            Hit::ResizeHandle => self.controller.begin_resize_from(x_px, drawn_width),
            Hit::ExpandAll => self.keep_selection(SidebarController::expand_all),
            Hit::CollapseAll => self.keep_selection(SidebarController::collapse_all),
            Hit::Filter => return self.start_filter(),
            Hit::Toggle(position) => {
                self.selected = position;
                self.toggle_selected();
            }
            Hit::Row(position) => {
                self.selected = position;
                return self
                    .selected_slug()
                    .map(|slug| Action::OpenPage(slug.to_string()))
                    .unwrap_or(Action::None);
            }
            Hit::Sidebar => {}
            Hit::Content => self.focused = false,
        }
        Action::None
    }
}
