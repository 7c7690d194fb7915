//! TUI widgets

pub mod account;
pub mod buckets;
pub mod chart;
pub mod help;
pub mod spinner;
pub mod tabs;
