//! API module for the dashboard's HTTP endpoints

pub mod client_addr;
pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
