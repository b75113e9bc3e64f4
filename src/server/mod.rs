//! Server module
//!
//! - `config`: configuration structures
//! - `loader`: configuration loading from files and environment
//! - `shutdown`: signal handling
//! - `init`: router assembly and the run loop

pub mod config;
mod init;
mod loader;
mod shutdown;

pub use init::{build_app, run};
pub use loader::load_config;
