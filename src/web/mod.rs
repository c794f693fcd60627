//! HTTP surface: module data reads, cell mutations and cache administration.

pub mod cache_admin;
pub mod datasets;
pub mod error;
pub mod middleware;
pub mod mutations;
pub mod routes;
pub mod status;

pub use routes::*;
