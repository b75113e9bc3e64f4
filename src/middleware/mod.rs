//! HTTP middleware
//!
//! - `cors`: preflight answers and permissive CORS headers

pub mod cors;

pub use cors::CorsLayer;
