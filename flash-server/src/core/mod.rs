//! Core infrastructure: configuration, logging, state and background tasks

pub mod config;
pub mod logger;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use logger::init_logger;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
