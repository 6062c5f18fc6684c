use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ── Page records ─────────────────────────────────────────────────────

/// A flat wiki page as stored by the backend, already filtered to the
/// pages the requesting viewer may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub slug: String,
}

// ── PageNode ─────────────────────────────────────────────────────────

/// One entry in the rendered page tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    pub title: String,
    pub slug: String,
    pub url: String,
    #[serde(default)]
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

// ── Tree building ────────────────────────────────────────────────────

/// Build the nested page tree from a flat list of visible pages.
///
/// Pages whose parent is missing from `pages` (filtered out, or never
/// existed) become roots. Every sibling list is ordered by lowercased title;
/// the sort is stable, so equal titles keep their input order.
pub fn build_tree<F>(pages: &[PageRecord], url_for: F) -> Vec<PageNode>
where
    F: Fn(&PageRecord) -> String,
{
    let visible: HashSet<i64> = pages.iter().map(|p| p.id).collect();

    let mut by_parent: HashMap<Option<i64>, Vec<&PageRecord>> = HashMap::new();
    for page in pages {
        let parent = page.parent_id.filter(|id| visible.contains(id));
        by_parent.entry(parent).or_default().push(page);
    }

    build_children(&by_parent, None, &url_for)
}

fn build_children<F>(
    by_parent: &HashMap<Option<i64>, Vec<&PageRecord>>,
    parent_id: Option<i64>,
    url_for: &F,
) -> Vec<PageNode>
where
    F: Fn(&PageRecord) -> String,
{
    let Some(siblings) = by_parent.get(&parent_id) else {
        return Vec::new();
    };

    let mut siblings = siblings.clone();
    siblings.sort_by_cached_key(|p| p.title.to_lowercase());

    siblings
        .into_iter()
        .map(|page| PageNode {
            title: page.title.clone(),
            slug: page.slug.clone(),
            url: url_for(page),
            children: build_children(by_parent, Some(page.id), url_for),
        })
        .collect()
}

// ── Tree traversal ───────────────────────────────────────────────────

/// Total number of nodes in the tree.
pub fn count_nodes(nodes: &[PageNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

/// Map every non-root slug to its parent's slug.
pub fn parent_map(nodes: &[PageNode]) -> HashMap<String, String> {
    fn walk(nodes: &[PageNode], parent: Option<&str>, out: &mut HashMap<String, String>) {
        for node in nodes {
            if let Some(parent) = parent {
                out.insert(node.slug.clone(), parent.to_string());
            }
            walk(&node.children, Some(&node.slug), out);
        }
    }

    let mut map = HashMap::new();
    walk(nodes, None, &mut map);
    map
}

/// The slug itself followed by each ancestor up to its root.
///
/// Returns just `[slug]` when the slug is a root or is not in the tree.
pub fn ancestor_path(nodes: &[PageNode], slug: &str) -> Vec<String> {
    let parents = parent_map(nodes);
    let mut path = vec![slug.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([slug]);

    let mut current = slug;
    while let Some(parent) = parents.get(current) {
        // Duplicate slugs in a malformed tree could chain back on themselves.
        if !seen.insert(parent.as_str()) {
            break;
        }
        path.push(parent.clone());
        current = parent.as_str();
    }
    path
}

// ── Tests ────────────────────────────────────────────────────────────
