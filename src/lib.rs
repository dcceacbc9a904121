//! coi-serve
//!
//! Static file server whose responses carry the cross-origin isolation
//! headers browsers require before exposing `SharedArrayBuffer`.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::Config;
pub use error::ServerError;
pub use handler::StaticHandler;
pub use server::Server;
