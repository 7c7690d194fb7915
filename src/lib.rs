//! rctrack: track the RC cost of claiming Hive accounts

pub mod cli;
pub mod config;
pub mod logging;
pub mod services;
pub mod tui;
pub mod types;
