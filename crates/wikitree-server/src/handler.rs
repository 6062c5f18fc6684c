use anyhow::Result;
use axum::http::StatusCode;
use rusqlite::Connection;
use tracing::debug;
use wikitree_core::access::{AllowAll, PageAccess, Viewer, filter_visible};
use wikitree_core::tree::build_tree;
use wikitree_core::wire::SidebarResponse;

use crate::access::PageAclAccess;
use crate::model;

/// Link target of a wiki page. The slug is percent-encoded as one path
/// segment.
pub fn page_url(project_identifier: &str, slug: &str) -> String {
    format!(
        "/projects/{project_identifier}/wiki/{}",
        urlencoding::encode(slug)
    )
}

/// Answer a tree request for `identifier` on behalf of `viewer`.
///
/// Unknown project and disabled wiki answer 404, a viewer who may not read
/// the wiki 403; all three with the empty tree. `page` is echoed back as
/// `current_page`.
pub fn sidebar_response(
    conn: &Connection,
    identifier: &str,
    viewer: &Viewer,
    page: Option<String>,
    page_acl: bool,
) -> Result<(StatusCode, SidebarResponse)> {
    let Some(project) = model::find_project(conn, identifier)? else {
        debug!(project = identifier, "Sidebar requested for unknown project");
        return Ok((StatusCode::NOT_FOUND, SidebarResponse::empty()));
    };

    if !model::can_view_wiki(conn, &project, viewer)? {
        debug!(project = identifier, viewer = ?viewer.login, "Viewer may not read this wiki");
        return Ok((StatusCode::FORBIDDEN, SidebarResponse::empty()));
    }

    if !project.wiki_enabled {
        return Ok((StatusCode::NOT_FOUND, SidebarResponse::empty()));
    }

    let pages = model::list_pages(conn, project.id)?;
    let acl = PageAclAccess::new(conn);
    let access: &dyn PageAccess = if page_acl { &acl } else { &AllowAll };
    let visible = filter_visible(pages, access, viewer);

    let tree = build_tree(&visible, |page| page_url(&project.identifier, &page.slug));
    Ok((
        StatusCode::OK,
        SidebarResponse {
            pages: tree,
            current_page: page,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikitree_core::db::open_memory_db;

    fn setup_db() -> Connection {
        let conn = open_memory_db().unwrap();
        model::init_db(&conn).unwrap();

        let docs = model::add_project(&conn, "docs", "Docs", true).unwrap();
        let guide = model::add_page(&conn, docs, None, "guide").unwrap();
        model::add_page(&conn, docs, Some(guide), "setup").unwrap();
        model::add_page(&conn, docs, Some(guide), "Install").unwrap();
        let secret = model::add_page(&conn, docs, None, "Secret").unwrap();
        model::grant_page_access(&conn, secret, "alice").unwrap();

        let internal = model::add_project(&conn, "internal", "Internal", false).unwrap();
        model::add_member(&conn, internal, "alice").unwrap();
        model::add_page(&conn, internal, None, "Roadmap").unwrap();
        conn
    }

    fn titles(response: &SidebarResponse) -> Vec<&str> {
        response.pages.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_builds_sorted_tree() {
        let conn = setup_db();
        let (status, body) = sidebar_response(
            &conn,
            "docs",
            &Viewer::anonymous(),
            Some("setup".to_string()),
            false,
        )
        .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["guide", "Secret"]);
        let children: Vec<&str> = body.pages[0].children.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(children, vec!["Install", "setup"]);
        assert_eq!(body.pages[0].children[1].url, "/projects/docs/wiki/setup");
        assert_eq!(body.current_page.as_deref(), Some("setup"));
    }

    #[test]
    fn test_unknown_project() {
        let conn = setup_db();
        let (status, body) =
            sidebar_response(&conn, "nope", &Viewer::anonymous(), None, false).unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, SidebarResponse::empty());
    }

    #[test]
    fn test_private_project_needs_membership() {
        let conn = setup_db();
        let (status, body) =
            sidebar_response(&conn, "internal", &Viewer::user("bob"), None, false).unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, SidebarResponse::empty());

        let (status, body) =
            sidebar_response(&conn, "internal", &Viewer::user("alice"), None, false).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Roadmap"]);
    }

    #[test]
    fn test_disabled_wiki() {
        let conn = setup_db();
        let docs = model::find_project(&conn, "docs").unwrap().unwrap();
        model::set_wiki_enabled(&conn, docs.id, false).unwrap();

        let (status, body) =
            sidebar_response(&conn, "docs", &Viewer::anonymous(), None, false).unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.pages.is_empty());
    }

    #[test]
    fn test_page_acl_is_opt_in() {
        let conn = setup_db();
        let (_, body) = sidebar_response(&conn, "docs", &Viewer::anonymous(), None, true).unwrap();
        assert_eq!(titles(&body), vec!["guide"]);

        let (_, body) =
            sidebar_response(&conn, "docs", &Viewer::user("alice"), None, true).unwrap();
        assert_eq!(titles(&body), vec!["guide", "Secret"]);
    }

    #[test]
    fn test_page_urls_escape_slug() {
        let conn = setup_db();
        let docs = model::find_project(&conn, "docs").unwrap().unwrap();
        model::add_page(&conn, docs.id, None, "C# tips").unwrap();
        model::add_page(&conn, docs.id, None, "100% done").unwrap();

        let (_, body) = sidebar_response(&conn, "docs", &Viewer::anonymous(), None, false).unwrap();
        let urls: Vec<(&str, &str)> = body
            .pages
            .iter()
            .map(|p| (p.slug.as_str(), p.url.as_str()))
            .collect();
        assert!(urls.contains(&("C#_tips", "/projects/docs/wiki/C%23_tips")));
        assert!(urls.contains(&("100%_done", "/projects/docs/wiki/100%25_done")));
        assert!(urls.contains(&("guide", "/projects/docs/wiki/guide")));
    }
}
