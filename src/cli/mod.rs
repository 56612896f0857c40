//! CLI module for tabfetch - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
