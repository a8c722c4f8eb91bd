//! Command-line front end for spreadsheet import and case folder management.

pub mod cli;

pub use cli::{run, run_with_args, Args};
