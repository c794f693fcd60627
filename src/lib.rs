pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod logging;
pub mod modules;
pub mod sheets;
pub mod state;
pub mod utils;
pub mod web;
