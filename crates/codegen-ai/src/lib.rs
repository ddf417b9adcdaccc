//! codegen-ai: Completion endpoint clients and wire types
//!
//! This crate defines the message format exchanged with a completion
//! endpoint and the HTTP clients that talk to it.

pub mod client;
pub mod error;
pub mod providers;
pub mod types;
pub mod usage;

pub use client::{BoxedClient, CompletionClient};
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use usage::{UsageClient, UsageQuota};
