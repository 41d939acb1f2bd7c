//! Command-line front end for `tspipe`.

pub mod args;
pub mod output;
pub mod reporter;
