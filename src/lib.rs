pub mod config;
pub mod constants;
pub mod error;
pub mod gemini;
pub mod router;
pub mod session;
pub mod table;
pub mod web_server;
