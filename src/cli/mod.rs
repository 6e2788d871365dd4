//! CLI module for docqa
//! 
//! Handles command-line argument parsing and flag overrides of the loaded configuration.

pub mod args;

pub use args::{Args, Commands, Verbosity};
