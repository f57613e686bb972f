//! Command-line front end: program identity, display-level macros,
//! argument parsing, and help text.

pub mod args;
pub mod constants;
pub mod help;

pub use args::{parse_args, parse_args_from, ParsedArgs};
