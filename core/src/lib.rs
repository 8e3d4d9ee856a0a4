//! yload-core: Rate-paced load generation engine
//!
//! This crate provides the protocol-agnostic dispatch engine used by the
//! `yload` tool, including:
//!
//! - Run parameters and their derived concurrency
//! - The [`Caller`] capability implemented per protocol
//! - The ticket pool bounding in-flight calls
//! - The [`LoadGenerator`] lifecycle and the per-call timeout race
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod generator;
pub mod request;
pub mod response;
pub mod tickets;
pub mod traits;

pub use channel::ChannelConfig;
pub use config::{ConfigError, ParamSet, Rate, DEFAULT_UNRATED_CONCURRENCY, MAX_CONCURRENCY};
pub use error::*;
pub use generator::{GeneratorBuilder, GeneratorStats, LoadGenerator, Status};
pub use request::*;
pub use response::*;
pub use tickets::{Ticket, TicketPool};
pub use traits::*;
