//! Command-line front end over the query engine

pub mod commands;
pub mod display;
