//! Configuration for the reader.
//!
//! Settings are loaded from `conf/config.toml` when present. The file is laid
//! out in sections (`[reading]`, `[narration]`, ...) that flatten into one
//! [`AppConfig`]; any missing or invalid entry falls back to its default.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, save_config, serialize_config};
pub use models::{AppConfig, LogLevel};
