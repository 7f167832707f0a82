//! Command-line interface components
//!
//! Argument parsing and the terminal progress display for the demo host.

pub mod args;
pub mod progress;

pub use args::{Cli, FetchArgs, GlobalArgs};
pub use progress::{ProgressConfig, ProgressDisplay};
