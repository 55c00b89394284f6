//! Interfaces provided by the embedding VST3 host.
//!
//! These mirror `Steinberg::Linux::IRunLoop` and friends. A real host binding
//! implements them on top of the SDK objects; tests implement them with mocks.

use std::os::raw::c_int;
use std::sync::Arc;

/// File descriptor type used by the host run loop.
pub type FileDescriptor = c_int;

/// Result code returned by host run-loop calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostResult {
    /// `kResultOk` / `kResultTrue`.
    Ok,
    /// `kResultFalse`.
    False,
    /// `kInvalidArgument`.
    InvalidArgument,
    /// `kNotImplemented`.
    NotImplemented,
}

impl HostResult {
    pub fn is_ok(self) -> bool {
        matches!(self, HostResult::Ok)
    }
}

/// Callback invoked by the host when a watched descriptor becomes readable.
pub trait HostEventHandler: Send + Sync {
    fn on_fd_is_set(&self, fd: FileDescriptor);
}

/// Callback invoked by the host when a registered timer elapses.
pub trait HostTimerHandler: Send + Sync {
    fn on_timer(&self);
}

/// The host's run loop as exposed to plugin editors on Linux.
///
/// Handlers are identified by their allocation; an unregister call receives
/// the same `Arc` that was registered.
pub trait HostRunLoop: Send + Sync {
    fn register_event_handler(
        &self,
        handler: Arc<dyn HostEventHandler>,
        fd: FileDescriptor,
    ) -> HostResult;
    fn unregister_event_handler(&self, handler: &Arc<dyn HostEventHandler>) -> HostResult;
    fn register_timer(&self, handler: Arc<dyn HostTimerHandler>, interval_ms: u64) -> HostResult;
    fn unregister_timer(&self, handler: &Arc<dyn HostTimerHandler>) -> HostResult;
}

/// Dispatcher that applies queued GUI changes when asked to flush.
pub trait DeferredUpdates: Send + Sync {
    fn trigger_deferred_updates(&self);
}

/// Returns true when both handles point at the same allocation.
///
/// Only the data address is compared so that trait objects created through
/// different vtables still match.
pub fn same_object<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}
