//! CLI module - argument parsing, stage runners and interactive prompts

mod args;
pub mod prompts;
pub mod stages;

pub use args::{Cli, Commands};
pub use prompts::*;
pub use stages::*;
