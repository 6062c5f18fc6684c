use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input modes, modeled after vim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Navigation and tree actions via keybinds.
    #[default]
    Normal,
    /// Typing into the sidebar filter. Entered with `/`, left with `Enter` or `Esc`.
    Insert,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "FILTER",
        }
    }
}

/// Actions that can result from processing a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The key was consumed but nothing happens.
    None,
    /// Quit the browser.
    Quit,
    /// Switch to a specific input mode.
    SetMode(InputMode),
    MoveDown(usize),
    MoveUp(usize),
    GotoTop,
    GotoBottom,
    HalfPageDown,
    HalfPageUp,
    /// Open the selected page.
    Confirm,
    /// Expand the selected node.
    Expand,
    /// Collapse the selected node, or jump to its parent.
    Collapse,
    /// Flip the selected node.
    ToggleNode,
    ExpandAll,
    CollapseAll,
    /// Start typing a filter.
    Search,
    /// Make the sidebar wider by one step.
    Widen,
    /// Make the sidebar narrower by one step.
    Narrow,
    /// Reload the current page.
    Reload,
    /// Leader key (Space) was pressed.
    LeaderKey,
    /// A leader key sequence was completed with this key.
    LeaderSequence(char),
    /// Load another wiki page (by slug).
    OpenPage(String),
}

/// Pending key state for multi-key sequences like `gg`.
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    /// Whether the leader key (Space) was just pressed.
    pub leader_active: bool,
    /// Pending first key of a two-key sequence.
    pub pending_key: Option<char>,
}

impl KeyState {
    pub fn reset(&mut self) {
        self.leader_active = false;
        self.pending_key = None;
    }
}

/// Process a key event in Normal mode, accounting for multi-key sequences.
pub fn process_normal_key(key: KeyEvent, state: &mut KeyState) -> Action {
    if state.leader_active {
        state.leader_active = false;
        return match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char(c) => Action::LeaderSequence(c),
            _ => Action::None,
        };
    }

    if let Some(pending) = state.pending_key.take() {
        return match (pending, key.code) {
            ('g', KeyCode::Char('g')) => Action::GotoTop,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char(' ') => {
            state.leader_active = true;
            Action::LeaderKey
        }
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown(1),
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp(1),
        KeyCode::Char('G') => Action::GotoBottom,
        KeyCode::Char('g') => {
            state.pending_key = Some('g');
            Action::None
        }
        KeyCode::Char('d') if key.modifiers == KeyModifiers::CONTROL => Action::HalfPageDown,
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => Action::HalfPageUp,
        KeyCode::Char('l') | KeyCode::Right => Action::Expand,
        KeyCode::Char('h') | KeyCode::Left => Action::Collapse,
        KeyCode::Tab => Action::ToggleNode,
        KeyCode::Char('E') => Action::ExpandAll,
        KeyCode::Char('Z') => Action::CollapseAll,
        KeyCode::Enter => Action::Confirm,
        KeyCode::Char('/') => Action::Search,
        KeyCode::Char('>') => Action::Widen,
        KeyCode::Char('<') => Action::Narrow,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}
