//! Caller implementations for yload
//!
//! This crate provides implementations of the `Caller` trait for:
//!
//! - HTTP endpoints (`reqwest`)
//! - An in-process echo callee, for dry runs and tests
//!
//! Both send the same JSON [`Operation`] payload.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod echo;
pub mod http;
pub mod operation;

pub use echo::EchoCaller;
pub use http::{HttpCaller, HttpCallerError};
pub use operation::Operation;
