//! sigdash terminal client.
//!
//! Wires the components together:
//! - REST client for snapshot polls and mode toggles
//! - Push subscription for `new_signal` events
//! - Sync loop owning the signal feed and mode state
//! - Terminal renderer and stdin commands

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod render;

pub use app::{Application, Session};
pub use command::Command;
pub use crate::config::{AppConfig, WsConfig};
pub use error::{AppError, AppResult};
