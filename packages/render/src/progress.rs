//! Progress reporting for frame batches.
//!
//! [`render_frames`](crate::render_frames) reports one unit per frame
//! through a [`ProgressCallback`], so the binary can show a bar while tests
//! and library callers stay silent.

/// Receives progress updates from a frame batch.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of frames.
    fn set_total(&self, total: u64);

    /// Advances by `delta` frames.
    fn inc(&self, delta: u64);

    /// Updates the message shown next to the bar.
    fn set_message(&self, msg: String);

    /// Marks the batch complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
