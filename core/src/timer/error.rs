//! Error types for timer creation

use std::io;
use thiserror::Error;

/// Errors reported by `Timer::new` and `TimerBuilder::spawn`.
///
/// Every other timer operation is infallible once the timer exists.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("not enough memory to create timer worker")]
    Allocation(#[source] io::Error),

    #[error("failed to spawn timer worker thread")]
    SynchronizationInit(#[source] io::Error),
}

impl TimerError {
    /// Classify a failed `std::thread::Builder::spawn`.
    pub(crate) fn from_spawn(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::OutOfMemory {
            TimerError::Allocation(err)
        } else {
            TimerError::SynchronizationInit(err)
        }
    }
}
