pub mod access;
pub mod handler;
pub mod model;
pub mod routes;
pub mod server;

mod error;

pub use error::{Result, ServerError};
pub use routes::AppState;
pub use server::{router, start_server};
