use anyhow::Result;
use rusqlite::Connection;

use wikitree_server::model;

/// Seed two demo projects. Does nothing once any project exists.
pub fn seed_demo_data(conn: &Connection) -> Result<()> {
    model::init_db(conn)?;

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    seed_handbook(conn)?;
    seed_internal(conn)?;
    Ok(())
}

fn seed_handbook(conn: &Connection) -> Result<()> {
    let project = model::add_project(conn, "handbook", "Team Handbook", true)?;

    let _ = model::add_page(conn, project, None, "Wiki")?;

    let guides = model::add_page(conn, project, None, "Guides")?;
    let setup = model::add_page(conn, project, Some(guides), "Getting started")?;
    let _ = model::add_page(conn, project, Some(setup), "Install the toolchain")?;
    let _ = model::add_page(conn, project, Some(setup), "Configure your editor")?;
    let _ = model::add_page(conn, project, Some(guides), "Code review")?;
    let _ = model::add_page(conn, project, Some(guides), "Releasing")?;

    let ops = model::add_page(conn, project, None, "Operations")?;
    let _ = model::add_page(conn, project, Some(ops), "On-call")?;
    let incidents = model::add_page(conn, project, Some(ops), "Incident response")?;
    let _ = model::add_page(conn, project, Some(incidents), "Postmortem template")?;

    let salaries = model::add_page(conn, project, None, "Salary bands")?;
    model::grant_page_access(conn, salaries, "admin")?;

    Ok(())
}

fn seed_internal(conn: &Connection) -> Result<()> {
    let project = model::add_project(conn, "internal", "Internal", false)?;
    model::add_member(conn, project, "admin")?;
    model::add_member(conn, project, "alice")?;

    let roadmap = model::add_page(conn, project, None, "Roadmap")?;
    let _ = model::add_page(conn, project, Some(roadmap), "Q1 goals")?;
    let _ = model::add_page(conn, project, Some(roadmap), "Q2 goals")?;
    let _ = model::add_page(conn, project, None, "Meeting notes")?;

    Ok(())
}
