//! CLI command implementations

mod cast;
mod config;
mod receive;

pub use cast::{cast, CastArgs};
pub use config::{config, ConfigArgs};
pub use receive::{receive, ReceiveArgs};
