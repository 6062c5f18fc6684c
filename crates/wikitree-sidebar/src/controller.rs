use tracing::{debug, error, info, warn};
use wikitree_core::state::{ClientState, MOBILE_BREAKPOINT};
use wikitree_core::storage::KeyValueStore;
use wikitree_core::tree::{PageNode, ancestor_path, count_nodes};
use wikitree_core::wire::SidebarResponse;

use crate::config::SidebarConfig;
use crate::fetch::{FetchError, TreeRequest, TreeSource};
use crate::view::{ContentRegion, SidebarView};

/// An in-progress drag on the resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResizeGesture {
    start_x: i64,
    start_width: u32,
}

/// Owns the sidebar for one page load: persisted state, the fetch, the
/// rendered view and every interaction on it.
pub struct SidebarController {
    config: SidebarConfig,
    state: ClientState,
    filter_text: String,
    store: Box<dyn KeyValueStore>,
    source: Box<dyn TreeSource>,
    view: Option<SidebarView>,
    content: ContentRegion,
    resize: Option<ResizeGesture>,
    fetch_pending: bool,
}

impl SidebarController {
    /// Load the project's persisted state and start fetching the tree.
    ///
    /// Viewports narrower than the mobile breakpoint start hidden; that
    /// override applies to this load only and is not persisted.
    pub fn init(
        config: SidebarConfig,
        store: Box<dyn KeyValueStore>,
        source: Box<dyn TreeSource>,
        viewport_width_px: u32,
    ) -> Self {
        let mut state = ClientState::load(store.as_ref(), &config.project_id, config.default_width);
        if viewport_width_px < MOBILE_BREAKPOINT {
            debug!(viewport_width_px, "Narrow viewport; sidebar starts hidden");
            state.sidebar_visible = false;
        }

        let mut controller = Self {
            config,
            state,
            filter_text: String::new(),
            store,
            source,
            view: None,
            content: ContentRegion::default(),
            resize: None,
            fetch_pending: false,
        };
        controller.fetch_tree();
        controller
    }

    /// Issue the read-only tree request. Returns immediately.
    pub fn fetch_tree(&mut self) {
        let url = match self.config.request_url() {
            Ok(url) => url,
            Err(e) => {
                error!(project = %self.config.project_id, "WikiSidebar: {e}");
                return;
            }
        };

        debug!(%url, "Requesting page tree");
        self.source.request(TreeRequest {
            url,
            remote_user: self.config.remote_user.clone(),
            csrf_token: self.config.csrf_token.clone(),
        });
        self.fetch_pending = true;
    }

    /// Pick up a finished fetch, if any. Returns true when the sidebar was
    /// rendered by this call.
    pub fn tick(&mut self) -> bool {
        if !self.fetch_pending {
            return false;
        }
        let Some(result) = self.source.poll() else {
            return false;
        };
        self.fetch_pending = false;

        match result {
            Ok(data) => self.render(data),
            Err(FetchError::Status(status)) => {
                warn!(status, "WikiSidebar: HTTP {status}");
                false
            }
            Err(e) => {
                error!("WikiSidebar: {e}");
                false
            }
        }
    }

    /// Build the sidebar from a fetched tree and splice it next to the page
    /// content. Only the first call per load has any effect.
    pub fn render(&mut self, data: SidebarResponse) -> bool {
        if self.view.is_some() {
            debug!("Sidebar already rendered for this page load");
            return false;
        }

        self.auto_expand_path(&data.pages, data.current_page.as_deref());

        let mut view = SidebarView::build(&data.pages, &self.state, data.current_page.as_deref());
        view.hidden = !self.state.sidebar_visible;

        self.content = ContentRegion {
            has_sidebar: true,
            sidebar_collapsed: !self.state.sidebar_visible,
            toggle_button: true,
        };

        info!(
            project = %self.config.project_id,
            pages = count_nodes(&data.pages),
            visible = self.state.sidebar_visible,
            "Rendered wiki sidebar"
        );
        self.view = Some(view);
        true
    }

    /// Flip one node and persist. Only that item is redrawn.
    pub fn toggle_node(&mut self, slug: &str) -> bool {
        let expanded = self.state.toggle(slug);
        self.save_expanded_state();
        if let Some(view) = &mut self.view {
            view.refresh_node(slug, &self.state);
        }
        expanded
    }

    /// Expand every item that has children.
    pub fn expand_all(&mut self) {
        if let Some(view) = &mut self.view {
            for item in view.items.iter().filter(|item| item.has_children()) {
                self.state.set_expanded(&item.slug, true);
            }
            view.refresh_all(&self.state);
        }
        self.save_expanded_state();
    }

    /// Forget every expanded node.
    pub fn collapse_all(&mut self) {
        self.state.clear_expanded();
        if let Some(view) = &mut self.view {
            view.refresh_all(&self.state);
        }
        self.save_expanded_state();
    }

    /// Mark the current page and all of its ancestors expanded. Never
    /// collapses anything.
    pub fn auto_expand_path(&mut self, pages: &[PageNode], current_slug: Option<&str>) {
        let Some(current_slug) = current_slug else {
            return;
        };

        for slug in ancestor_path(pages, current_slug) {
            self.state.set_expanded(&slug, true);
        }
        self.save_expanded_state();
    }

    /// Replace the filter input and re-filter.
    pub fn set_filter_text(&mut self, text: &str) {
        self.filter_text = text.to_string();
        self.apply_filter();
    }

    pub fn apply_filter(&mut self) {
        let filter = self.filter_text.to_lowercase();
        if let Some(view) = &mut self.view {
            view.apply_filter(&filter, &self.state);
        }
    }

    // ── Resize ───────────────────────────────────────────────────────

    /// Press on the resize handle at horizontal position `x_px`.
    pub fn begin_resize(&mut self, x_px: i64) {
        self.begin_resize_from(x_px, self.state.sidebar_width);
    }

    /// Press on the resize handle of a sidebar drawn `drawn_width_px` wide.
    /// The drag measures from that width, which is narrower than the stored
    /// one when the page leaves no room for it.
    pub fn begin_resize_from(&mut self, x_px: i64, drawn_width_px: u32) {
        self.resize = Some(ResizeGesture {
            start_x: x_px,
            start_width: drawn_width_px,
        });
    }

    /// Move during a resize. Applies the clamped width live without
    /// persisting it. Returns the applied width.
    pub fn drag_resize(&mut self, x_px: i64) -> Option<u32> {
        let gesture = self.resize?;
        let width = self
            .state
            .set_width(gesture.start_width as i64 + (x_px - gesture.start_x));
        if let Some(view) = &mut self.view {
            view.width = width;
        }
        Some(width)
    }

    /// Release the resize handle and persist the final width.
    pub fn end_resize(&mut self) {
        if self.resize.take().is_some() {
            debug!(width = self.state.sidebar_width, "Sidebar resized");
            self.state.save_width(self.store.as_ref(), &self.config.project_id);
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// A complete resize gesture of `delta_px`.
    pub fn nudge_width(&mut self, delta_px: i64) -> u32 {
        self.begin_resize(0);
        self.drag_resize(delta_px);
        self.end_resize();
        self.state.sidebar_width
    }

    // ── Visibility ───────────────────────────────────────────────────

    /// Show or hide the rendered sidebar and persist the choice. Returns the
    /// new visibility. Does nothing before the sidebar is rendered.
    pub fn toggle_visibility(&mut self) -> bool {
        let Some(view) = &mut self.view else {
            return self.state.sidebar_visible;
        };

        self.state.sidebar_visible = !self.state.sidebar_visible;
        self.state
            .save_visible(self.store.as_ref(), &self.config.project_id);

        view.hidden = !self.state.sidebar_visible;
        self.content.sidebar_collapsed = !self.state.sidebar_visible;
        self.state.sidebar_visible
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &SidebarConfig {
        &self.config
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn view(&self) -> Option<&SidebarView> {
        self.view.as_ref()
    }

    pub fn content(&self) -> ContentRegion {
        self.content
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn is_fetch_pending(&self) -> bool {
        self.fetch_pending
    }

    pub fn is_rendered(&self) -> bool {
        self.view.is_some()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Hand the store back so the next page load can reuse it.
    pub fn into_store(self) -> Box<dyn KeyValueStore> {
        self.store
    }

    fn save_expanded_state(&self) {
        self.state
            .save_expanded(self.store.as_ref(), &self.config.project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchResult, StaticTreeSource};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use wikitree_core::state::DEFAULT_WIDTH;
    use wikitree_core::storage::MemoryStore;

    const DESKTOP: u32 = 1280;

    fn node(slug: &str, children: Vec<PageNode>) -> PageNode {
        PageNode {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            url: format!("/projects/docs/wiki/{slug}"),
            children,
        }
    }

    fn sections() -> Vec<PageNode> {
        vec![
            node(
                "section-a",
                vec![node("child-1", vec![]), node("child-2", vec![])],
            ),
            node("section-b", vec![node("child-3", vec![])]),
        ]
    }

    fn config() -> SidebarConfig {
        SidebarConfig::new("docs", "http://localhost:3000/projects/docs/wiki/sidebar.json")
    }

    fn controller_with(store: Box<dyn KeyValueStore>, result: FetchResult) -> SidebarController {
        SidebarController::init(
            config(),
            store,
            Box::new(StaticTreeSource::new(result)),
            DESKTOP,
        )
    }

    fn rendered(pages: Vec<PageNode>, current_page: Option<&str>) -> SidebarController {
        let mut controller = controller_with(
            Box::new(MemoryStore::new()),
            Ok(SidebarResponse {
                pages,
                current_page: current_page.map(str::to_string),
            }),
        );
        assert!(controller.tick());
        controller
    }

    fn stored(controller: &SidebarController, key: &str) -> Option<String> {
        controller
            .store()
            .get_item(&format!("wiki_sidebar_docs_{key}"))
            .unwrap()
    }

    /// Records requests into shared state and never answers.
    struct RecordingSource(Rc<RefCell<Vec<TreeRequest>>>);

    impl TreeSource for RecordingSource {
        fn request(&mut self, request: TreeRequest) {
            self.0.borrow_mut().push(request);
        }

        fn poll(&mut self) -> Option<FetchResult> {
            None
        }
    }

    /// A fetch thread that has gone away: every poll reports the failure.
    struct DeadSource(Rc<RefCell<usize>>);

    impl TreeSource for DeadSource {
        fn request(&mut self, _request: TreeRequest) {}

        fn poll(&mut self) -> Option<FetchResult> {
            *self.0.borrow_mut() += 1;
            Some(Err(FetchError::Transport("fetch thread stopped".into())))
        }
    }

    /// Fails every read and write.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("storage disabled")
        }

        fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    #[test]
    fn test_init_fetches_without_blocking() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let config = config()
            .with_current_page(Some("child-2".to_string()))
            .with_remote_user(Some("alice".to_string()));
        let mut controller = SidebarController::init(
            config,
            Box::new(MemoryStore::new()),
            Box::new(RecordingSource(requests.clone())),
            DESKTOP,
        );

        assert!(controller.is_fetch_pending());
        assert!(!controller.tick());
        assert!(!controller.is_rendered());

        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), Some("page=child-2"));
        assert_eq!(requests[0].remote_user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_invalid_url_never_requests() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let controller = SidebarController::init(
            SidebarConfig::new("docs", "not a url"),
            Box::new(MemoryStore::new()),
            Box::new(RecordingSource(requests.clone())),
            DESKTOP,
        );
        assert!(!controller.is_fetch_pending());
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_render_injects_sidebar() {
        let controller = rendered(sections(), None);
        let view = controller.view().unwrap();

        assert_eq!(view.items.len(), 5);
        assert_eq!(view.width, DEFAULT_WIDTH);
        assert!(!view.hidden);
        assert_eq!(
            controller.content(),
            ContentRegion {
                has_sidebar: true,
                sidebar_collapsed: false,
                toggle_button: true,
            }
        );
    }

    #[test]
    fn test_render_happens_once() {
        let mut controller = rendered(sections(), None);
        assert!(!controller.render(SidebarResponse::empty()));
        assert_eq!(controller.view().unwrap().items.len(), 5);
    }

    #[test]
    fn test_auto_expand_current_path() {
        let store = MemoryStore::new();
        store
            .set_item("wiki_sidebar_docs_expanded", r#"{"section-b": true}"#)
            .unwrap();
        let mut controller = controller_with(
            Box::new(store),
            Ok(SidebarResponse {
                pages: sections(),
                current_page: Some("child-2".to_string()),
            }),
        );
        assert!(controller.tick());

        let expected: BTreeMap<String, bool> = [
            ("child-2".to_string(), true),
            ("section-a".to_string(), true),
            ("section-b".to_string(), true),
        ]
        .into();
        assert_eq!(controller.state().expanded_nodes, expected);
        assert_eq!(
            stored(&controller, "expanded").as_deref(),
            Some(r#"{"child-2":true,"section-a":true,"section-b":true}"#)
        );

        let view = controller.view().unwrap();
        assert!(view.item("child-2").unwrap().active);
        assert!(!view.item("section-a").unwrap().children_collapsed);
    }

    #[test]
    fn test_auto_expand_without_current_page_is_noop() {
        let mut controller = rendered(sections(), None);
        controller.auto_expand_path(&sections(), None);
        assert!(controller.state().expanded_nodes.is_empty());
        assert_eq!(stored(&controller, "expanded"), None);
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut controller = rendered(sections(), None);

        assert!(controller.toggle_node("section-a"));
        assert!(
            !controller
                .view()
                .unwrap()
                .item("section-a")
                .unwrap()
                .children_collapsed
        );
        assert!(!controller.toggle_node("section-a"));
        assert!(!controller.state().is_expanded("section-a"));
        assert_eq!(
            stored(&controller, "expanded").as_deref(),
            Some(r#"{"section-a":false}"#)
        );
    }

    #[test]
    fn test_expand_all_then_collapse_all_twice() {
        let mut controller = rendered(sections(), None);

        controller.expand_all();
        assert!(controller.state().is_expanded("section-a"));
        assert!(controller.state().is_expanded("section-b"));
        // Leaves are not recorded.
        assert!(!controller.state().expanded_nodes.contains_key("child-1"));
        assert_eq!(controller.view().unwrap().visible_rows().len(), 5);

        controller.collapse_all();
        assert!(controller.state().expanded_nodes.is_empty());
        controller.collapse_all();
        assert!(controller.state().expanded_nodes.is_empty());
        assert_eq!(stored(&controller, "expanded").as_deref(), Some("{}"));
        assert_eq!(controller.view().unwrap().visible_rows().len(), 2);
    }

    #[test]
    fn test_filter_round_trip() {
        let tree = vec![PageNode {
            title: "A".into(),
            slug: "a".into(),
            url: "/a".into(),
            children: vec![
                PageNode {
                    title: "B".into(),
                    slug: "b".into(),
                    url: "/b".into(),
                    children: vec![],
                },
                PageNode {
                    title: "C".into(),
                    slug: "c".into(),
                    url: "/c".into(),
                    children: vec![],
                },
            ],
        }];
        let mut controller = rendered(tree, None);
        let before = controller.view().unwrap().clone();

        controller.set_filter_text("B");
        let view = controller.view().unwrap();
        assert!(!view.item("a").unwrap().hidden);
        assert!(!view.item("b").unwrap().hidden);
        assert!(view.item("c").unwrap().hidden);
        // Forced open on screen, still collapsed in state.
        assert!(!view.item("a").unwrap().children_collapsed);
        assert!(!controller.state().is_expanded("a"));

        controller.set_filter_text("");
        assert_eq!(controller.view().unwrap(), &before);
        assert_eq!(controller.filter_text(), "");
    }

    #[test]
    fn test_resize_clamps_and_persists_on_release() {
        let mut controller = rendered(sections(), None);

        controller.begin_resize(280);
        assert_eq!(controller.drag_resize(150), Some(200));
        assert_eq!(controller.view().unwrap().width, 200);
        assert_eq!(stored(&controller, "width"), None);
        controller.end_resize();
        assert_eq!(stored(&controller, "width").as_deref(), Some("200"));

        controller.begin_resize(0);
        assert_eq!(controller.drag_resize(400), Some(500));
        controller.end_resize();
        assert_eq!(controller.state().sidebar_width, 500);
        assert_eq!(stored(&controller, "width").as_deref(), Some("500"));
    }

    #[test]
    fn test_resize_starts_from_drawn_width() {
        let mut controller = rendered(sections(), None);

        controller.begin_resize_from(232, 240);
        assert_eq!(controller.drag_resize(248), Some(256));
        controller.end_resize();
        assert_eq!(stored(&controller, "width").as_deref(), Some("256"));
    }

    #[test]
    fn test_drag_without_gesture_is_ignored() {
        let mut controller = rendered(sections(), None);
        assert_eq!(controller.drag_resize(999), None);
        controller.end_resize();
        assert_eq!(stored(&controller, "width"), None);
    }

    #[test]
    fn test_nudge_width() {
        let mut controller = rendered(sections(), None);
        assert_eq!(controller.nudge_width(16), DEFAULT_WIDTH + 16);
        assert!(!controller.is_resizing());
        assert_eq!(stored(&controller, "width").as_deref(), Some("296"));
    }

    #[test]
    fn test_toggle_visibility_persists() {
        let mut controller = rendered(sections(), None);

        assert!(!controller.toggle_visibility());
        assert!(controller.view().unwrap().hidden);
        assert!(controller.content().sidebar_collapsed);
        assert_eq!(stored(&controller, "visible").as_deref(), Some("false"));

        assert!(controller.toggle_visibility());
        assert!(!controller.content().sidebar_collapsed);
        assert_eq!(stored(&controller, "visible").as_deref(), Some("true"));
    }

    #[test]
    fn test_mobile_viewport_hides_without_persisting() {
        let mut controller = SidebarController::init(
            config(),
            Box::new(MemoryStore::new()),
            Box::new(StaticTreeSource::new(Ok(SidebarResponse {
                pages: sections(),
                current_page: None,
            }))),
            600,
        );
        assert!(controller.tick());

        assert!(!controller.state().sidebar_visible);
        assert!(controller.view().unwrap().hidden);
        assert!(controller.content().sidebar_collapsed);
        assert_eq!(stored(&controller, "visible"), None);
    }

    #[test]
    fn test_empty_tree_renders_header_only() {
        let controller = rendered(Vec::new(), None);
        let view = controller.view().unwrap();
        assert_eq!(view.title, "Pages");
        assert!(view.visible_rows().is_empty());
        assert!(controller.content().has_sidebar);
    }

    #[test]
    fn test_forbidden_response_leaves_page_untouched() {
        let mut controller =
            controller_with(Box::new(MemoryStore::new()), Err(FetchError::Status(403)));
        assert!(!controller.tick());
        assert!(!controller.is_fetch_pending());
        assert!(controller.view().is_none());
        assert_eq!(controller.content(), ContentRegion::default());
    }

    #[test]
    fn test_dead_source_is_polled_once() {
        let polls = Rc::new(RefCell::new(0));
        let mut controller = SidebarController::init(
            config(),
            Box::new(MemoryStore::new()),
            Box::new(DeadSource(polls.clone())),
            DESKTOP,
        );

        assert!(!controller.tick());
        assert!(!controller.is_fetch_pending());
        assert!(!controller.tick());
        assert!(!controller.tick());
        assert_eq!(*polls.borrow(), 1);
        assert!(controller.view().is_none());
    }

    #[test]
    fn test_malformed_response_leaves_page_untouched() {
        let mut controller = controller_with(
            Box::new(MemoryStore::new()),
            Err(FetchError::Parse("expected value at line 1".into())),
        );
        assert!(!controller.tick());
        assert!(controller.view().is_none());
    }

    #[test]
    fn test_broken_store_still_renders() {
        let mut controller = controller_with(
            Box::new(BrokenStore),
            Ok(SidebarResponse {
                pages: sections(),
                current_page: Some("child-1".to_string()),
            }),
        );
        assert!(controller.tick());
        assert!(controller.state().is_expanded("section-a"));

        controller.toggle_node("section-b");
        controller.nudge_width(-500);
        assert!(controller.state().is_expanded("section-b"));
        assert_eq!(controller.state().sidebar_width, 200);
    }
}
