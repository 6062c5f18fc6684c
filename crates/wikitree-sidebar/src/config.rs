use crate::fetch::FetchError;
use reqwest::Url;
use wikitree_core::state::DEFAULT_WIDTH;
use wikitree_core::wire::PAGE_QUERY_PARAM;

/// Everything the host page hands the sidebar on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarConfig {
    /// Project identifier; namespaces the persisted state.
    pub project_id: String,
    /// Absolute URL of the tree endpoint.
    pub sidebar_url: String,
    /// Slug of the page being viewed, if any.
    pub current_page: Option<String>,
    /// Width used until the user resizes the sidebar.
    pub default_width: u32,
    /// Login forwarded to the endpoint as the viewer identity.
    pub remote_user: Option<String>,
    /// Anti-forgery token, when the host issues one.
    pub csrf_token: Option<String>,
}

impl SidebarConfig {
    pub fn new(project_id: impl Into<String>, sidebar_url: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            sidebar_url: sidebar_url.into(),
            current_page: None,
            default_width: DEFAULT_WIDTH,
            remote_user: None,
            csrf_token: None,
        }
    }

    pub fn with_current_page(mut self, slug: Option<String>) -> Self {
        self.current_page = slug;
        self
    }

    pub fn with_default_width(mut self, width: u32) -> Self {
        self.default_width = width;
        self
    }

    pub fn with_remote_user(mut self, login: Option<String>) -> Self {
        self.remote_user = login;
        self
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    /// The tree endpoint URL with the current page appended as `?page=`.
    pub fn request_url(&self) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.sidebar_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", self.sidebar_url)))?;
        if let Some(page) = &self.current_page {
            url.query_pairs_mut().append_pair(PAGE_QUERY_PARAM, page);
        }
        Ok(url)
    }
}
