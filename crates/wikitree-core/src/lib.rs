pub mod access;
pub mod db;
pub mod keybinds;
pub mod logging;
pub mod settings;
pub mod state;
pub mod storage;
pub mod tree;
pub mod ui;
pub mod wire;
