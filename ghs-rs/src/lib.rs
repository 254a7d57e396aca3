//! GHS-RS library
//!
//! Command-line front end over the Gregory Horror Show format crates.

pub mod cli;
pub mod commands;
pub mod utils;
