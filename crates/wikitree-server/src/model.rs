use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use wikitree_core::access::Viewer;
use wikitree_core::tree::PageRecord;

// ── Data models ──────────────────────────────────────────────────────

/// A project owning one wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub is_public: bool,
    pub wiki_enabled: bool,
}

// ── Database ─────────────────────────────────────────────────────────

/// Initialize the wiki tables.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identifier TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            is_public INTEGER NOT NULL DEFAULT 1,
            wiki_enabled INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS project_members (
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            login TEXT NOT NULL,
            PRIMARY KEY (project_id, login)
        );

        CREATE TABLE IF NOT EXISTS wiki_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            parent_id INTEGER REFERENCES wiki_pages(id) ON DELETE SET NULL,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (project_id, slug)
        );

        CREATE TRIGGER IF NOT EXISTS wiki_pages_updated_at
        AFTER UPDATE ON wiki_pages
        BEGIN
            UPDATE wiki_pages SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
        END;

        CREATE TABLE IF NOT EXISTS wiki_page_acl (
            page_id INTEGER NOT NULL REFERENCES wiki_pages(id) ON DELETE CASCADE,
            login TEXT NOT NULL,
            PRIMARY KEY (page_id, login)
        );",
    )?;
    Ok(())
}

/// Derive a page slug from its title: whitespace runs become `_` and
/// `, . / ? ; : |` are dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if matches!(c, ',' | '.' | '/' | '?' | ';' | ':' | '|') {
            continue;
        }
        if pending_space && !slug.is_empty() {
            slug.push('_');
        }
        pending_space = false;
        slug.push(c);
    }
    slug
}

// ── Projects ─────────────────────────────────────────────────────────

/// Add a project. Returns its ID.
pub fn add_project(conn: &Connection, identifier: &str, name: &str, is_public: bool) -> Result<i64> {
    conn.execute(
        "INSERT INTO projects (identifier, name, is_public) VALUES (?1, ?2, ?3)",
        rusqlite::params![identifier, name, is_public as i64],
    )
    .with_context(|| format!("Failed to add project {identifier}"))?;
    Ok(conn.last_insert_rowid())
}

/// Look up a project by identifier.
pub fn find_project(conn: &Connection, identifier: &str) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, identifier, name, is_public, wiki_enabled
             FROM projects WHERE identifier = ?1",
            rusqlite::params![identifier],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    identifier: row.get(1)?,
                    name: row.get(2)?,
                    is_public: row.get::<_, i64>(3)? != 0,
                    wiki_enabled: row.get::<_, i64>(4)? != 0,
                })
            },
        )
        .optional()?;
    Ok(project)
}

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, identifier, name, is_public, wiki_enabled
         FROM projects ORDER BY identifier ASC",
    )?;
    let projects = stmt
        .query_map([], |row| {
            Ok(Project {
                id: row.get(0)?,
                identifier: row.get(1)?,
                name: row.get(2)?,
                is_public: row.get::<_, i64>(3)? != 0,
                wiki_enabled: row.get::<_, i64>(4)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects)
}

pub fn set_wiki_enabled(conn: &Connection, project_id: i64, enabled: bool) -> Result<()> {
    conn.execute(
        "UPDATE projects SET wiki_enabled = ?1 WHERE id = ?2",
        rusqlite::params![enabled as i64, project_id],
    )?;
    Ok(())
}

pub fn add_member(conn: &Connection, project_id: i64, login: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO project_members (project_id, login) VALUES (?1, ?2)",
        rusqlite::params![project_id, login],
    )?;
    Ok(())
}

pub fn is_member(conn: &Connection, project_id: i64, login: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM project_members WHERE project_id = ?1 AND login = ?2",
            rusqlite::params![project_id, login],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Whether `viewer` may read the project's wiki pages: public projects are
/// readable by everyone, private ones by members only.
pub fn can_view_wiki(conn: &Connection, project: &Project, viewer: &Viewer) -> Result<bool> {
    if project.is_public {
        return Ok(true);
    }
    match &viewer.login {
        Some(login) => is_member(conn, project.id, login),
        None => Ok(false),
    }
}

// ── Wiki pages ───────────────────────────────────────────────────────

/// Add a wiki page. The slug is derived from the title. Returns its ID.
pub fn add_page(
    conn: &Connection,
    project_id: i64,
    parent_id: Option<i64>,
    title: &str,
) -> Result<i64> {
    let slug = slugify(title);
    conn.execute(
        "INSERT INTO wiki_pages (project_id, parent_id, title, slug) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![project_id, parent_id, title, slug],
    )
    .with_context(|| format!("Failed to add wiki page {slug}"))?;
    Ok(conn.last_insert_rowid())
}

/// All pages of a project, ordered by title.
pub fn list_pages(conn: &Connection, project_id: i64) -> Result<Vec<PageRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, parent_id, title, slug
         FROM wiki_pages
         WHERE project_id = ?1
         ORDER BY title ASC",
    )?;
    let pages = stmt
        .query_map(rusqlite::params![project_id], |row| {
            Ok(PageRecord {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                title: row.get(2)?,
                slug: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pages)
}

// ── Page ACL ─────────────────────────────────────────────────────────

/// Allow `login` to see a page. A page with any ACL rows is restricted to
/// the listed logins.
pub fn grant_page_access(conn: &Connection, page_id: i64, login: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO wiki_page_acl (page_id, login) VALUES (?1, ?2)",
        rusqlite::params![page_id, login],
    )?;
    Ok(())
}

/// Logins allowed to see a page. Empty means unrestricted.
pub fn page_acl(conn: &Connection, page_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT login FROM wiki_page_acl WHERE page_id = ?1 ORDER BY login ASC")?;
    let logins = stmt
        .query_map(rusqlite::params![page_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(logins)
}

// ── Tests ────────────────────────────────────────────────────────────
