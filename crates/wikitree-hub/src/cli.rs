use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "wikitree")]
#[command(about = "Wiki page tree sidebar: serve the tree endpoint or browse a project wiki")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database file (defaults to wikitree.db in the data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the sidebar tree endpoint
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Hide pages whose ACL does not list the viewer
        #[arg(long)]
        page_acl: bool,

        /// Seed demo projects before serving
        #[arg(long)]
        seed_demo: bool,
    },

    /// Browse a project wiki with the page tree sidebar
    Browse {
        /// Project identifier
        #[arg(short, long)]
        project: String,

        /// Slug of the page to open
        #[arg(long)]
        page: Option<String>,

        /// Base URL of the tree server
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Login to browse as (anonymous when omitted)
        #[arg(short, long)]
        user: Option<String>,

        /// Anti-forgery token sent with every tree request
        #[arg(long)]
        csrf_token: Option<String>,
    },

    /// Show or change the sidebar settings
    Settings {
        /// Enable the sidebar
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the sidebar
        #[arg(long)]
        disable: bool,

        /// Width in pixels used until a user resizes the sidebar
        #[arg(long)]
        default_width: Option<u32>,
    },

    /// Seed demo projects and pages
    Seed,
}
