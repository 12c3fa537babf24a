//! Quickcare HTTP server: appointment booking and medical records with
//! role-based access control.

pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use server::{build_app, default_state, QuickcareServer, ServerBuilder};
pub use state::AppState;
