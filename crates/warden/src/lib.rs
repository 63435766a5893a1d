//! Uptime warden daemon: configuration and HTTP surface

pub mod api;
pub mod config;
