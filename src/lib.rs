//! binshim: redistribute prebuilt release binaries through npm.
//!
//! - [`pack`] builds one npm package per platform from a release version
//! - [`launch`] finds the installed platform binary and runs it transparently
//! - [`setup`] stores the wrapped tool's provider configuration

pub mod config;
pub mod error;
pub mod fsutil;
pub mod launch;
pub mod pack;
pub mod platform;
pub mod setup;

pub use config::ShimConfig;
pub use error::{Result, ShimError};
