// Read-only HTTP API over the warehouse for the dashboard

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
