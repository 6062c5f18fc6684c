use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tracing::{debug, error, info};

use wikitree_core::{
    keybinds::{Action, InputMode, KeyState, process_normal_key},
    settings::Settings,
    storage::KeyValueStore,
    ui,
};
use wikitree_sidebar::{
    HttpTreeSource, SidebarConfig, SidebarController, SidebarPanel, ui::render_sidebar_panel,
    ui::viewport_width_px,
    view::{COLLAPSE_ALL_LABEL, EXPAND_ALL_LABEL},
};

/// What to browse, from the command line.
#[derive(Debug, Clone)]
pub struct BrowseOptions {
    pub project: String,
    pub page: Option<String>,
    pub server: String,
    pub user: Option<String>,
    pub csrf_token: Option<String>,
}

/// Tree endpoint of `project` on `server`.
pub fn sidebar_url(server: &str, project: &str) -> String {
    format!(
        "{}/projects/{project}/wiki/sidebar.json",
        server.trim_end_matches('/')
    )
}

/// The wiki browser: a page view with the tree sidebar spliced in beside it.
pub struct App {
    options: BrowseOptions,
    settings: Settings,
    /// Sidebar for the current page load. `None` when disabled or not yet built.
    sidebar: Option<SidebarPanel>,
    /// Held here between page loads, and while no sidebar is shown.
    idle_store: Option<Box<dyn KeyValueStore>>,
    /// Key state when no sidebar consumes keys.
    key_state: KeyState,
    /// Terminal width in columns.
    columns: u16,
    /// Area shared by sidebar and page, from the last frame.
    body_area: Rect,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    pub fn new(
        options: BrowseOptions,
        settings: Settings,
        store: Box<dyn KeyValueStore>,
        columns: u16,
    ) -> Self {
        let mut app = Self {
            options,
            settings,
            sidebar: None,
            idle_store: Some(store),
            key_state: KeyState::default(),
            columns,
            body_area: Rect::default(),
            should_quit: false,
        };
        app.load_page(app.options.page.clone());
        app
    }

    /// Navigate to `slug`. Every navigation is a fresh page load: the old
    /// sidebar and its in-flight fetch are dropped and a new one is built.
    fn load_page(&mut self, slug: Option<String>) {
        info!(project = %self.options.project, page = ?slug, "Loading page");
        self.options.page = slug;

        if let Some(panel) = self.sidebar.take() {
            self.idle_store = Some(panel.into_controller().into_store());
        }
        if !self.settings.enabled {
            debug!("Sidebar disabled in settings");
            return;
        }
        let Some(store) = self.idle_store.take() else {
            return;
        };

        let source = match HttpTreeSource::spawn() {
            Ok(source) => source,
            Err(e) => {
                error!("WikiSidebar: {e:#}");
                self.idle_store = Some(store);
                return;
            }
        };

        let config = SidebarConfig::new(
            self.options.project.clone(),
            sidebar_url(&self.options.server, &self.options.project),
        )
        .with_current_page(self.options.page.clone())
        .with_default_width(self.settings.default_width)
        .with_remote_user(self.options.user.clone())
        .with_csrf_token(self.options.csrf_token.clone());

        let controller = SidebarController::init(
            config,
            store,
            Box::new(source),
            viewport_width_px(self.columns),
        );
        self.sidebar = Some(SidebarPanel::new(controller));
    }

    /// Poll the sidebar fetch (called every ~50ms).
    pub fn tick(&mut self) {
        if let Some(panel) = &mut self.sidebar {
            panel.tick();
        }
    }

    /// Handle a terminal event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => {
                if let Some(panel) = &mut self.sidebar {
                    let action = panel.handle_mouse(mouse, self.body_area);
                    self.process_action(action);
                }
            }
            Event::Paste(text) => {
                if let Some(panel) = &mut self.sidebar {
                    panel.handle_paste(&text);
                }
            }
            Event::Resize(columns, _) => self.columns = columns,
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl-c always quits
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.should_quit = true;
            return;
        }

        let action = match &mut self.sidebar {
            Some(panel) => panel.handle_key(key),
            None => process_normal_key(key, &mut self.key_state),
        };
        self.process_action(action);
    }

    /// Process an action the sidebar did not consume.
    fn process_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::OpenPage(slug) => self.load_page(Some(slug)),
            Action::Reload => self.load_page(self.options.page.clone()),
            Action::LeaderSequence('w') | Action::Search => {
                if let Some(panel) = &mut self.sidebar {
                    let focused = panel.is_focused();
                    panel.set_focused(!focused);
                }
            }
            _ => {}
        }
    }

    /// Render the entire application.
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let (title_area, body_area, status_area) = ui::standard_layout(area);
        self.body_area = body_area;

        ui::render_title_bar(
            frame,
            title_area,
            &self.options.project,
            self.options.page.as_deref(),
        );

        let content_area = match &self.sidebar {
            Some(panel) => render_sidebar_panel(frame, body_area, panel),
            None => body_area,
        };
        self.render_page(frame, content_area);

        let (mode, label) = match &self.sidebar {
            Some(panel) if panel.is_focused() => (panel.mode(), "Pages"),
            _ => (InputMode::Normal, "Page"),
        };
        let info = self.status_info();
        ui::render_status_bar(frame, status_area, mode, label, &info);
    }

    fn status_info(&self) -> String {
        let Some(panel) = &self.sidebar else {
            return "r:reload  q:quit".to_string();
        };
        if panel.controller().is_fetch_pending() {
            return "Loading page tree...".to_string();
        }
        if panel.is_filtering() {
            return "Enter:keep filter  Esc:clear".to_string();
        }
        if panel.is_focused() {
            return format!(
                "Enter:open  Tab:toggle  E:{EXPAND_ALL_LABEL}  Z:{COLLAPSE_ALL_LABEL}  /:filter  </>:width  Space e:hide  Space w:page"
            );
        }
        "Space e:pages  Space w:focus pages  r:reload  q:quit".to_string()
    }

    /// The page itself. Page bodies are not served, so this shows where the
    /// viewer is and how to reach the sidebar.
    fn render_page(&self, frame: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);

        let title = match &self.options.page {
            Some(slug) => slug.replace('_', " "),
            None => "Wiki".to_string(),
        };
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(title, bold)),
            Line::from(""),
        ];
        if let Some(slug) = &self.options.page {
            lines.push(Line::from(vec![
                Span::styled("  Page: ", dim),
                Span::raw(format!("/projects/{}/wiki/{slug}", self.options.project)),
            ]));
        }
        let viewer = self.options.user.as_deref().unwrap_or("anonymous");
        lines.push(Line::from(vec![
            Span::styled("  Viewer: ", dim),
            Span::raw(viewer.to_string()),
        ]));
        lines.push(Line::from(""));

        match &self.sidebar {
            Some(panel) => {
                let content = panel.controller().content();
                if content.toggle_button {
                    let label = if content.sidebar_collapsed {
                        "[ Show pages ]"
                    } else {
                        "[ Hide pages ]"
                    };
                    lines.push(Line::from(vec![
                        Span::styled(label, bold),
                        Span::styled("  <Space>e", dim),
                    ]));
                }
            }
            None if !self.settings.enabled => {
                lines.push(Line::from(Span::styled("  Page tree sidebar is disabled", dim)));
            }
            None => {}
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}
