//! Command-line interface components
//!
//! This module contains CLI-specific code for the media cache application:
//! argument parsing, command handlers and interrupt handling.

pub mod args;
pub mod commands;
pub mod signals;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, GetArgs, GlobalArgs, InitArgs, ParseArgs, ThumbArgs,
};
pub use commands::{
    handle_cache, handle_get, handle_init, handle_parse, handle_thumb, CommandContext,
};
pub use signals::shutdown_signal;
