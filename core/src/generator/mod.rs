//! Load generator: rate-paced dispatch of concurrent calls
//!
//! A [`LoadGenerator`] ticks at the configured rate. Each tick takes a
//! ticket from a bounded pool and spawns one call task; the task races the
//! call against its timeout and delivers exactly one [`CallOutcome`] to the
//! result channel returned by [`GeneratorBuilder::build`].
//!
//! The run ends when the duration elapses or [`LoadGenerator::stop`] is
//! called. Either way the result channel is closed, so the consumer sees
//! end-of-stream once buffered outcomes have been read.
//!
//! [`CallOutcome`]: crate::CallOutcome

mod builder;
mod call;
mod executor;
mod pacer;
mod stats;
mod status;

pub use builder::GeneratorBuilder;
pub use executor::LoadGenerator;
pub use stats::GeneratorStats;
pub use status::Status;
