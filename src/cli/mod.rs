//! Command line front end for the analysis layer
//!
//! Argument parsing and loading of problem/solution inputs from disk.

pub mod args;
pub mod input;

pub use args::{Args, Commands};
pub use input::{InputError, InputLoader};
