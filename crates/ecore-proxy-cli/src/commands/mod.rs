//! Subcommand implementations

pub mod check;
pub mod demo;
pub mod inspect;
