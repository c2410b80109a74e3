//! Command-line interface components
//!
//! Argument parsing, command handlers and signal handling for the
//! `catalog_fetcher` binary.

pub mod args;
pub mod commands;
pub mod signals;

pub use args::{Cli, Commands, DiscoverArgs, DownloadArgs, FetchArgs, GlobalArgs};
pub use commands::{handle_discover, handle_download, handle_fetch, handle_stats};
pub use signals::cancel_on_signal;
