//! discrip command-line application.
//!
//! The binary in `main.rs` parses arguments, resolves a [`RipperConfig`],
//! and dispatches to a handler. The scan loop lives in [`ripper`].

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod ripper;

pub use bootstrap::{DriveContext, bootstrap};
pub use config::RipperConfig;
pub use error::CliError;
pub use parser::{Cli, Commands};
pub use ripper::{Ripper, RipperError};
