//! Timer seam. The runtime owns exactly one repeating tick per active
//! session plus one pending reconnect timeout; both are expressed against
//! this trait so browser drivers, native drivers, and tests plug in the same
//! way.

/// Cancels the underlying scheduled work when dropped, so holding the handle
/// is what keeps a timer alive.
pub struct TaskHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TaskHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

pub trait Scheduler {
    /// Wall-clock milliseconds. Only differences are meaningful.
    fn now_ms(&self) -> f64;

    /// Runs `callback` once after `delay_ms`, unless the handle is dropped
    /// first.
    fn timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TaskHandle;

    /// Runs `callback` every `period_ms` until the handle is dropped.
    fn interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> TaskHandle;
}
