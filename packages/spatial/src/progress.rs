//! Progress reporting for the spatial join.
//!
//! The join only knows how many incidents it has processed. Rendering is
//! left to the caller: an `indicatif` bar in the CLI or nothing at all in
//! library use and tests.

use std::sync::Arc;

/// Receives progress updates from a long-running stage.
///
/// Implementations must be `Send + Sync` so a single callback can be shared
/// behind an [`Arc`].
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
