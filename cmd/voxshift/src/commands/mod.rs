//! CLI commands module.

mod config;
mod convert;
mod encode;
mod util;

pub use config::ConfigCommand;
pub use convert::ConvertCommand;
pub use encode::EncodeCommand;

pub(crate) use util::*;
