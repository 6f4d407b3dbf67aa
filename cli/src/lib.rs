//! CLI utilities for voxshift.
//!
//! Profile-based configuration files and report output shared by the
//! command-line binaries.

pub mod config;
pub mod output;

pub use config::{Config, Profile, load_config};
pub use output::{Output, OutputFormat};
