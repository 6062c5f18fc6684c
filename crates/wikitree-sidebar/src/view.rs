use std::collections::HashMap;

use wikitree_core::state::ClientState;
use wikitree_core::tree::PageNode;

/// Header title shown above the tree.
pub const SIDEBAR_TITLE: &str = "Pages";
/// Placeholder of the empty filter input.
pub const FILTER_PLACEHOLDER: &str = "Filter pages...";
pub const EXPAND_ALL_LABEL: &str = "Expand all";
pub const COLLAPSE_ALL_LABEL: &str = "Collapse all";

/// Row padding of a root item, in pixels.
pub const BASE_INDENT_PX: u32 = 12;
/// Extra padding per nesting level, in pixels.
pub const DEPTH_INDENT_PX: u32 = 16;

// ── NodeIcon ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIcon {
    Page,
    FolderClosed,
    FolderOpen,
}

impl NodeIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            NodeIcon::Page => "\u{1F4C4}",
            NodeIcon::FolderClosed => "\u{1F4C1}",
            NodeIcon::FolderOpen => "\u{1F4C2}",
        }
    }
}

// ── ItemView ─────────────────────────────────────────────────────────

/// One rendered tree item: its row plus, for parents, a children container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub slug: String,
    pub title: String,
    pub url: String,
    pub depth: usize,
    /// Index of the parent item in [`SidebarView::items`].
    pub parent: Option<usize>,
    /// Indices of the child items, in display order.
    pub children: Vec<usize>,
    /// Row of the page being viewed.
    pub active: bool,
    /// Arrow rotated to the expanded position. Always false for leaves.
    pub toggle_expanded: bool,
    pub icon: NodeIcon,
    /// Children container collapsed. Always false for leaves.
    pub children_collapsed: bool,
    /// Hidden by the filter.
    pub hidden: bool,
}

impl ItemView {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn padding_left_px(&self) -> u32 {
        BASE_INDENT_PX + DEPTH_INDENT_PX * self.depth as u32
    }
}

// ── SidebarView ──────────────────────────────────────────────────────

/// The injected sidebar: header, tree items and presentation flags.
///
/// Items are stored in pre-order, so every parent precedes its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarView {
    pub title: &'static str,
    pub filter_placeholder: &'static str,
    pub items: Vec<ItemView>,
    pub roots: Vec<usize>,
    by_slug: HashMap<String, usize>,
    /// Width in pixels.
    pub width: u32,
    /// `--hidden` presentation class.
    pub hidden: bool,
}

/// Shared inputs of the recursive build.
struct RenderContext<'a> {
    state: &'a ClientState,
    current_page: Option<&'a str>,
    items: Vec<ItemView>,
}

impl SidebarView {
    /// Render the page tree against the current expand state.
    pub fn build(pages: &[PageNode], state: &ClientState, current_page: Option<&str>) -> Self {
        let mut ctx = RenderContext {
            state,
            current_page,
            items: Vec::new(),
        };
        let roots = build_items(&mut ctx, pages, None, 0);

        let by_slug = ctx
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.slug.clone(), idx))
            .collect();

        Self {
            title: SIDEBAR_TITLE,
            filter_placeholder: FILTER_PLACEHOLDER,
            items: ctx.items,
            roots,
            by_slug,
            width: state.sidebar_width,
            hidden: !state.sidebar_visible,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, slug: &str) -> Option<usize> {
        self.by_slug.get(slug).copied()
    }

    pub fn item(&self, slug: &str) -> Option<&ItemView> {
        self.index_of(slug).map(|idx| &self.items[idx])
    }

    /// Re-derive one item's arrow, icon and children container from `state`.
    pub fn refresh_node(&mut self, slug: &str, state: &ClientState) {
        if let Some(idx) = self.index_of(slug) {
            refresh_item(&mut self.items[idx], state);
        }
    }

    /// Refresh every item.
    pub fn refresh_all(&mut self, state: &ClientState) {
        for item in &mut self.items {
            refresh_item(item, state);
        }
    }

    /// Show items whose title contains `filter` (already lowercased) and the
    /// ancestors of such items. Ancestors are drawn expanded without touching
    /// `state`. An empty filter shows everything with its persisted state.
    pub fn apply_filter(&mut self, filter: &str, state: &ClientState) {
        if filter.is_empty() {
            for item in &mut self.items {
                item.hidden = false;
                refresh_item(item, state);
            }
            return;
        }

        let matches: Vec<bool> = self
            .items
            .iter()
            .map(|item| item.title.to_lowercase().contains(filter))
            .collect();

        // Pre-order storage: walking backwards visits children before parents.
        let mut subtree_match = matches.clone();
        let mut descendant_match = vec![false; self.items.len()];
        for idx in (0..self.items.len()).rev() {
            descendant_match[idx] = self.items[idx]
                .children
                .iter()
                .any(|&child| subtree_match[child]);
            subtree_match[idx] = matches[idx] || descendant_match[idx];
        }

        for (idx, item) in self.items.iter_mut().enumerate() {
            item.hidden = !subtree_match[idx];
            if descendant_match[idx] {
                item.toggle_expanded = true;
                item.children_collapsed = false;
            } else {
                refresh_item(item, state);
            }
        }
    }

    /// Indices of the items currently on screen, in display order.
    pub fn visible_rows(&self) -> Vec<usize> {
        fn walk(view: &SidebarView, indices: &[usize], out: &mut Vec<usize>) {
            for &idx in indices {
                let item = &view.items[idx];
                if item.hidden {
                    continue;
                }
                out.push(idx);
                if !item.children_collapsed {
                    walk(view, &item.children, out);
                }
            }
        }

        let mut rows = Vec::new();
        walk(self, &self.roots, &mut rows);
        rows
    }
}

fn build_items(
    ctx: &mut RenderContext<'_>,
    pages: &[PageNode],
    parent: Option<usize>,
    depth: usize,
) -> Vec<usize> {
    let mut indices = Vec::with_capacity(pages.len());

    for page in pages {
        let idx = ctx.items.len();
        let expanded = ctx.state.is_expanded(&page.slug);
        let has_children = page.has_children();

        ctx.items.push(ItemView {
            slug: page.slug.clone(),
            title: page.title.clone(),
            url: page.url.clone(),
            depth,
            parent,
            children: Vec::new(),
            active: ctx.current_page == Some(page.slug.as_str()),
            toggle_expanded: has_children && expanded,
            icon: icon_for(has_children, expanded),
            children_collapsed: has_children && !expanded,
            hidden: false,
        });

        let children = build_items(ctx, &page.children, Some(idx), depth + 1);
        ctx.items[idx].children = children;
        indices.push(idx);
    }

    indices
}

fn icon_for(has_children: bool, expanded: bool) -> NodeIcon {
    match (has_children, expanded) {
        (false, _) => NodeIcon::Page,
        (true, true) => NodeIcon::FolderOpen,
        (true, false) => NodeIcon::FolderClosed,
    }
}

fn refresh_item(item: &mut ItemView, state: &ClientState) {
    if !item.has_children() {
        return;
    }
    let expanded = state.is_expanded(&item.slug);
    item.toggle_expanded = expanded;
    item.icon = icon_for(true, expanded);
    item.children_collapsed = !expanded;
}

// ── ContentRegion ────────────────────────────────────────────────────

/// Presentation flags of the page's main content region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentRegion {
    /// Sidebar injected next to the page content.
    pub has_sidebar: bool,
    /// Sidebar hidden; the content takes the freed width.
    pub sidebar_collapsed: bool,
    /// The show/hide control was added to the page toolbar.
    pub toggle_button: bool,
}
