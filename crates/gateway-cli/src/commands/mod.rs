//! CLI commands module.

pub mod chat;
pub mod costs;
pub mod embed;
pub mod info;
pub mod models;
