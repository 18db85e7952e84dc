//! Tasklock Library
//!
//! Task tracking backend: a SQLite-backed repository for ordered tasks with a
//! one-way time lock, served over a JSON HTTP API.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod lock;
pub mod logging;
pub mod server;
pub mod types;
pub mod validate;
