//! CLI module for mimic - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for extracting sources
//! from text, generating a source list, and running a refinement batch.

pub mod commands;

pub use commands::Cli;
