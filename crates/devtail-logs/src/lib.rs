//! Log processing for devtail
//!
//! This crate turns raw text chunks from a device-logging process into
//! structured entries, filters them, and streams the accepted ones to a
//! consumer channel.

mod error;
mod filter;
mod parser;
mod stream;

pub use error::{FilterError, ParseError, StreamError};
pub use filter::{AndroidFilter, EntryFilter, IosFilter};
pub use parser::{AndroidParser, EntryParser, IosParser};
pub use stream::{LogSession, Pipeline, StreamEvent};

// Re-export types used in our public API
pub use devtail_types::{AndroidPriority, Entry, IosPriority, Platform, PriorityLevel};
