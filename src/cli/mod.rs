// ABOUTME: CLI module for the recognizer workflow runner
// ABOUTME: Exports argument parsing, application config and the run and check commands

pub mod app;
pub mod args;
pub mod commands;
pub mod config;

pub use app::App;
pub use args::Args;
pub use config::Config;
