use rusqlite::Connection;
use wikitree_core::access::{PageAccess, Viewer};
use wikitree_core::tree::PageRecord;

use crate::model;

/// Page-level ACL backed by the `wiki_page_acl` table. Pages without rows
/// are visible to everyone who can read the wiki.
pub struct PageAclAccess<'a> {
    conn: &'a Connection,
}

impl<'a> PageAclAccess<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl PageAccess for PageAclAccess<'_> {
    fn visible_to(&self, page: &PageRecord, viewer: &Viewer) -> anyhow::Result<bool> {
        let allowed = model::page_acl(self.conn, page.id)?;
        if allowed.is_empty() {
            return Ok(true);
        }
        Ok(viewer
            .login
            .as_ref()
            .is_some_and(|login| allowed.contains(login)))
    }
}
