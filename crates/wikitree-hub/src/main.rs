mod app;
mod cli;
mod demo_seed;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use rusqlite::Connection;
use tracing::{info, warn};

use wikitree_core::storage::{KeyValueStore, MemoryStore, SqliteStore};
use wikitree_core::{db, logging, settings};
use wikitree_server::{AppState, model, start_server};

use app::{App, BrowseOptions};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db_path = cli.db.as_deref();

    match cli.command {
        Commands::Serve {
            addr,
            page_acl,
            seed_demo,
        } => {
            logging::init_stderr_logging(cli.verbose)?;
            serve(db_path, addr, page_acl, seed_demo)
        }
        Commands::Browse {
            project,
            page,
            server,
            user,
            csrf_token,
        } => {
            let log_path = logging::init_file_logging(cli.verbose)?;
            info!(log = %log_path.display(), "Starting browser");
            browse(
                db_path,
                BrowseOptions {
                    project,
                    page: page.filter(|slug| !slug.is_empty()),
                    server,
                    user,
                    csrf_token,
                },
            )
        }
        Commands::Settings {
            enable,
            disable,
            default_width,
        } => {
            logging::init_stderr_logging(cli.verbose)?;
            update_settings(db_path, enable, disable, default_width)
        }
        Commands::Seed => {
            logging::init_stderr_logging(cli.verbose)?;
            let conn = open(db_path)?;
            demo_seed::seed_demo_data(&conn)?;
            for project in model::list_projects(&conn)? {
                let visibility = if project.is_public { "public" } else { "private" };
                println!("{}  {} ({visibility})", project.identifier, project.name);
            }
            Ok(())
        }
    }
}

fn open(path: Option<&Path>) -> Result<Connection> {
    match path {
        Some(path) => db::open_db_at(path),
        None => db::open_db(),
    }
}

fn serve(
    db_path: Option<&Path>,
    addr: std::net::SocketAddr,
    page_acl: bool,
    seed_demo: bool,
) -> Result<()> {
    let conn = open(db_path)?;
    model::init_db(&conn)?;
    if seed_demo {
        demo_seed::seed_demo_data(&conn)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(start_server(addr, AppState::new(conn, page_acl)))
}

fn update_settings(
    db_path: Option<&Path>,
    enable: bool,
    disable: bool,
    default_width: Option<u32>,
) -> Result<()> {
    let conn = open(db_path)?;
    settings::init_db(&conn)?;
    let mut current = settings::load(&conn)?;

    let changed = enable || disable || default_width.is_some();
    if enable {
        current.enabled = true;
    }
    if disable {
        current.enabled = false;
    }
    if let Some(width) = default_width {
        current.default_width = width;
    }
    if changed {
        settings::save(&conn, &current)?;
        current = settings::load(&conn)?;
    }

    println!("enabled: {}", current.enabled);
    println!("default_width: {}px", current.default_width);
    Ok(())
}

/// Sidebar state store. Falls back to a session-only store when the
/// database cannot be opened.
fn open_store(path: Option<&Path>) -> Box<dyn KeyValueStore> {
    match open(path).and_then(SqliteStore::new) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Sidebar state will not persist: {e:#}");
            Box::new(MemoryStore::new())
        }
    }
}

fn browse(db_path: Option<&Path>, options: BrowseOptions) -> Result<()> {
    let conn = open(db_path)?;
    settings::init_db(&conn)?;
    let sidebar_settings = settings::load(&conn)?;
    let store = open_store(db_path);

    let (columns, _) = terminal::size()?;
    let mut app = App::new(options, sidebar_settings, store, columns);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(50);

    loop {
        terminal.draw(|frame| {
            app.render(frame);
        })?;

        if app.should_quit {
            return Ok(());
        }

        // Poll with timeout so the sidebar fetch is picked up promptly
        if event::poll(TICK_RATE)? {
            let ev = event::read()?;
            app.handle_event(ev);
        }

        app.tick();
    }
}
