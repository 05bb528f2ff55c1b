//! Progress reporting
//!
//! The pipeline emits one notification per masked frame through a small
//! sink trait. The sink is purely observational: it never feeds back into
//! the pipeline, and the pipeline runs silently when no sink is attached.
//! How progress is displayed (stderr, JSON, a progress bar) is entirely the
//! caller's concern.

/// A sink for per-frame progress notifications.
///
/// `frame_done(current, total)` is called exactly once per frame,
/// immediately after that frame has been masked and before the next frame
/// is processed. `current` is 1-based and strictly increasing up to
/// `total`. Implementations should return promptly; the pipeline calls
/// them synchronously.
pub trait ProgressSink {
    fn frame_done(&mut self, current: usize, total: usize);
}

/// Adapter that lets a closure act as a sink.
///
/// # Examples
///
/// ```
/// use gifkey::progress::{FnSink, ProgressSink};
///
/// let mut seen = Vec::new();
/// let mut sink = FnSink(|current, total| seen.push((current, total)));
/// sink.frame_done(1, 2);
/// sink.frame_done(2, 2);
/// drop(sink);
/// assert_eq!(seen, vec![(1, 2), (2, 2)]);
/// ```
pub struct FnSink<F>(pub F);

impl<F: FnMut(usize, usize)> ProgressSink for FnSink<F> {
    fn frame_done(&mut self, current: usize, total: usize) {
        (self.0)(current, total)
    }
}

/// A sink that records every notification, mainly useful in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<(usize, usize)>,
}

impl ProgressSink for RecordingSink {
    fn frame_done(&mut self, current: usize, total: usize) {
        self.calls.push((current, total));
    }
}
