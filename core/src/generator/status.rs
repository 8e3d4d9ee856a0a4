//! Atomic state flags: generator lifecycle and per-call status

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a load generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Built but not started
    NotStarted,
    /// Dispatching calls
    Running,
    /// Stopped; cannot be restarted
    Stopped,
}

impl Status {
    const fn as_u8(self) -> u8 {
        match self {
            Status::NotStarted => 0,
            Status::Running => 1,
            Status::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Status::NotStarted,
            1 => Status::Running,
            _ => Status::Stopped,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not_started"),
            Status::Running => write!(f, "running"),
            Status::Stopped => write!(f, "stopped"),
        }
    }
}

/// Lifecycle flag, changed only by compare-and-swap
#[derive(Debug)]
pub(crate) struct LifecycleState(AtomicU8);

impl LifecycleState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Status::NotStarted.as_u8()))
    }

    pub(crate) fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to`; fails if the current state is not `from`
    pub(crate) fn transition(&self, from: Status, to: Status) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Resolution of a single call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallStatus {
    Pending,
    TimedOut,
    Completed,
}

impl CallStatus {
    const fn as_u8(self) -> u8 {
        match self {
            CallStatus::Pending => 0,
            CallStatus::TimedOut => 1,
            CallStatus::Completed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => CallStatus::Pending,
            1 => CallStatus::TimedOut,
            _ => CallStatus::Completed,
        }
    }
}

/// Single-assignment call status shared by a call task and its timer
///
/// Whoever moves it out of `Pending` first owns the outcome of the call.
#[derive(Debug)]
pub(crate) struct CallState(AtomicU8);

impl CallState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(CallStatus::Pending.as_u8()))
    }

    pub(crate) fn get(&self) -> CallStatus {
        CallStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `Pending -> resolution`; true only for the first claimant
    pub(crate) fn claim(&self, resolution: CallStatus) -> bool {
        self.0
            .compare_exchange(
                CallStatus::Pending.as_u8(),
                resolution.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
