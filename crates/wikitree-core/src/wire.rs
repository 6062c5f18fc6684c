use crate::tree::PageNode;
use serde::{Deserialize, Serialize};

/// Query parameter carrying the current page's slug.
pub const PAGE_QUERY_PARAM: &str = "page";

/// Header carrying the authenticated viewer's login.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Anti-forgery token header, sent when the host provides a token.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

/// Body of the sidebar tree endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarResponse {
    #[serde(default)]
    pub pages: Vec<PageNode>,
    #[serde(default)]
    pub current_page: Option<String>,
}

impl SidebarResponse {
    /// The "no sidebar" answer: no pages, no current page.
    pub fn empty() -> Self {
        Self::default()
    }
}
