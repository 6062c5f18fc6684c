use crate::storage::{KeyValueStore, load_json, save_json, storage_key};
use std::collections::BTreeMap;

/// Sidebar width used when nothing has been persisted yet.
pub const DEFAULT_WIDTH: u32 = 280;
/// Narrowest allowed sidebar, in pixels.
pub const MIN_WIDTH: u32 = 200;
/// Widest allowed sidebar, in pixels.
pub const MAX_WIDTH: u32 = 500;
/// Viewports narrower than this start with the sidebar hidden.
pub const MOBILE_BREAKPOINT: u32 = 768;

const EXPANDED_KEY: &str = "expanded";
const VISIBLE_KEY: &str = "visible";
const WIDTH_KEY: &str = "width";

/// Clamp a raw width (possibly negative, from a drag delta) into range.
pub fn clamp_width(width: i64) -> u32 {
    width.clamp(MIN_WIDTH as i64, MAX_WIDTH as i64) as u32
}

/// Per-project sidebar preferences persisted across page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    /// slug → expanded. A missing slug, or `false`, means collapsed.
    pub expanded_nodes: BTreeMap<String, bool>,
    pub sidebar_visible: bool,
    pub sidebar_width: u32,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            expanded_nodes: BTreeMap::new(),
            sidebar_visible: true,
            sidebar_width: DEFAULT_WIDTH,
        }
    }
}

impl ClientState {
    /// Read a project's persisted state. Every field falls back to its
    /// default independently when missing or corrupt.
    pub fn load(store: &dyn KeyValueStore, project_id: &str, default_width: u32) -> Self {
        let default_width = clamp_width(default_width as i64);
        let expanded_nodes = load_json(
            store,
            &storage_key(project_id, EXPANDED_KEY),
            BTreeMap::new(),
        );
        let sidebar_visible = load_json(store, &storage_key(project_id, VISIBLE_KEY), true);
        let sidebar_width: i64 = load_json(
            store,
            &storage_key(project_id, WIDTH_KEY),
            default_width as i64,
        );

        Self {
            expanded_nodes,
            sidebar_visible,
            sidebar_width: clamp_width(sidebar_width),
        }
    }

    pub fn is_expanded(&self, slug: &str) -> bool {
        self.expanded_nodes.get(slug).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, slug: &str, expanded: bool) {
        self.expanded_nodes.insert(slug.to_string(), expanded);
    }

    /// Flip a node's expanded flag, returning the new value.
    pub fn toggle(&mut self, slug: &str) -> bool {
        let expanded = !self.is_expanded(slug);
        self.set_expanded(slug, expanded);
        expanded
    }

    /// Forget every expanded node.
    pub fn clear_expanded(&mut self) {
        self.expanded_nodes.clear();
    }

    /// Set the width, clamped into `[MIN_WIDTH, MAX_WIDTH]`.
    pub fn set_width(&mut self, width: i64) -> u32 {
        self.sidebar_width = clamp_width(width);
        self.sidebar_width
    }

    pub fn save_expanded(&self, store: &dyn KeyValueStore, project_id: &str) {
        save_json(
            store,
            &storage_key(project_id, EXPANDED_KEY),
            &self.expanded_nodes,
        );
    }

    pub fn save_visible(&self, store: &dyn KeyValueStore, project_id: &str) {
        save_json(
            store,
            &storage_key(project_id, VISIBLE_KEY),
            &self.sidebar_visible,
        );
    }

    pub fn save_width(&self, store: &dyn KeyValueStore, project_id: &str) {
        save_json(
            store,
            &storage_key(project_id, WIDTH_KEY),
            &self.sidebar_width,
        );
    }
}
