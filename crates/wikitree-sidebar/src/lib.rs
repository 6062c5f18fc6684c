pub mod config;
pub mod controller;
pub mod fetch;
pub mod panel;
pub mod ui;
pub mod view;

pub use config::SidebarConfig;
pub use controller::SidebarController;
pub use fetch::{FetchError, HttpTreeSource, StaticTreeSource, TreeSource};
pub use panel::SidebarPanel;
