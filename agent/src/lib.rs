pub mod channel;
pub mod config;
pub mod error;
pub mod handlers;
pub mod monitor;
pub mod poller;
pub mod routes;
pub mod state;
