//! Command handlers

pub mod config;
pub mod table;
pub mod watch;
