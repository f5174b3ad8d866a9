// HTTP API for the country cache: refresh, query, delete, status, summary image

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::ApiServer;
pub use state::AppState;
