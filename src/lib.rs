pub mod config;
pub mod connection;
pub mod error;
pub mod interaction;
pub mod middleware;
pub mod results;
pub mod server;
pub mod state;
pub mod user;

pub use server::Server;
