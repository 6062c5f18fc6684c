use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use wikitree_core::access::Viewer;
use wikitree_core::wire::{REMOTE_USER_HEADER, SidebarResponse};

use crate::error::{Result, ServerError};
use crate::handler;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    /// Enforce per-page ACL rows when building the tree.
    pub page_acl: bool,
}

impl AppState {
    pub fn new(conn: Connection, page_acl: bool) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            page_acl,
        }
    }
}

pub fn sidebar_routes() -> Router<AppState> {
    Router::new().route("/projects/{project_id}/wiki/sidebar.json", get(sidebar_tree))
}

#[derive(Debug, Default, Deserialize)]
pub struct SidebarQuery {
    page: Option<String>,
}

/// The authenticated login arrives from the fronting proxy. Missing or blank
/// means anonymous.
fn viewer_from_headers(headers: &HeaderMap) -> Viewer {
    headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .map(Viewer::user)
        .unwrap_or_default()
}

async fn sidebar_tree(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<SidebarQuery>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<SidebarResponse>)> {
    let viewer = viewer_from_headers(&headers);
    let page = query.page.filter(|slug| !slug.is_empty());

    let conn = state.db.lock().map_err(|_| ServerError::LockPoisoned)?;
    let (status, body) =
        handler::sidebar_response(&conn, &project_id, &viewer, page, state.page_acl)?;
    Ok((status, Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use wikitree_core::db::open_memory_db;

    use crate::model;

    fn app(page_acl: bool) -> Router {
        let conn = open_memory_db().unwrap();
        model::init_db(&conn).unwrap();
        let docs = model::add_project(&conn, "docs", "Docs", true).unwrap();
        let guide = model::add_page(&conn, docs, None, "Guide").unwrap();
        model::add_page(&conn, docs, Some(guide), "Setup").unwrap();
        let secret = model::add_page(&conn, docs, None, "Secret").unwrap();
        model::grant_page_access(&conn, secret, "alice").unwrap();
        model::add_project(&conn, "internal", "Internal", false).unwrap();

        sidebar_routes().with_state(AppState::new(conn, page_acl))
    }

    async fn get_json(app: Router, uri: &str, user: Option<&str>) -> (StatusCode, SidebarResponse) {
        let mut request = Request::builder().uri(uri);
        if let Some(user) = user {
            request = request.header(REMOTE_USER_HEADER, user);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_sidebar_json() {
        let (status, body) =
            get_json(app(false), "/projects/docs/wiki/sidebar.json?page=Setup", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.current_page.as_deref(), Some("Setup"));
        assert_eq!(body.pages.len(), 2);
        assert_eq!(body.pages[0].slug, "Guide");
        assert_eq!(body.pages[0].children[0].url, "/projects/docs/wiki/Setup");
    }

    #[tokio::test]
    async fn test_empty_page_param_is_none() {
        let (_, body) = get_json(app(false), "/projects/docs/wiki/sidebar.json?page=", None).await;
        assert_eq!(body.current_page, None);
    }

    #[tokio::test]
    async fn test_unknown_project_is_404() {
        let (status, body) = get_json(app(false), "/projects/nope/wiki/sidebar.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, SidebarResponse::empty());
    }

    #[tokio::test]
    async fn test_private_project_is_403_json() {
        let (status, body) =
            get_json(app(false), "/projects/internal/wiki/sidebar.json", Some("bob")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.pages.is_empty());
    }

    #[tokio::test]
    async fn test_remote_user_header_drives_page_acl() {
        let (_, body) = get_json(app(true), "/projects/docs/wiki/sidebar.json", Some("  ")).await;
        assert_eq!(body.pages.len(), 1);

        let (_, body) = get_json(app(true), "/projects/docs/wiki/sidebar.json", Some("alice")).await;
        assert_eq!(body.pages.len(), 2);
    }

    #[test]
    fn test_viewer_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(viewer_from_headers(&headers).is_anonymous());
        headers.insert(REMOTE_USER_HEADER, " alice ".parse().unwrap());
        assert_eq!(viewer_from_headers(&headers), Viewer::user("alice"));
    }
}
