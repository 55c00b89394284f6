//! Maps the host's `IRunLoop` onto the toolkit's X11 run-loop interface.
//!
//! Each toolkit handler is wrapped in a host-facing object that forwards the
//! host callback while it is still bound. Wrappers live in the bridge's
//! registries until the toolkit unregisters them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::host::{
    same_object, FileDescriptor, HostEventHandler, HostRunLoop, HostTimerHandler,
};
use crate::toolkit::{ToolkitEventHandler, ToolkitRunLoop, ToolkitTimerHandler};

/// Host-facing wrapper around a toolkit event handler.
pub struct EventHandlerWrapper {
    fd: FileDescriptor,
    handler: Mutex<Option<Arc<dyn ToolkitEventHandler>>>,
}

impl EventHandlerWrapper {
    fn new(fd: FileDescriptor, handler: Arc<dyn ToolkitEventHandler>) -> Self {
        Self {
            fd,
            handler: Mutex::new(Some(handler)),
        }
    }

    pub fn fd(&self) -> FileDescriptor {
        self.fd
    }

    fn is_bound_to(&self, handler: &Arc<dyn ToolkitEventHandler>) -> bool {
        self.handler
            .lock()
            .as_ref()
            .is_some_and(|bound| same_object(bound, handler))
    }

    fn release(&self) {
        self.handler.lock().take();
    }
}

impl HostEventHandler for EventHandlerWrapper {
    fn on_fd_is_set(&self, _fd: FileDescriptor) {
        // Clone out so the toolkit can unregister from inside its callback.
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler.on_event();
        }
    }
}

/// Host-facing wrapper around a toolkit timer handler.
pub struct TimerHandlerWrapper {
    interval_ms: u64,
    handler: Mutex<Option<Arc<dyn ToolkitTimerHandler>>>,
}

impl TimerHandlerWrapper {
    fn new(interval_ms: u64, handler: Arc<dyn ToolkitTimerHandler>) -> Self {
        Self {
            interval_ms,
            handler: Mutex::new(Some(handler)),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    fn is_bound_to(&self, handler: &Arc<dyn ToolkitTimerHandler>) -> bool {
        self.handler
            .lock()
            .as_ref()
            .is_some_and(|bound| same_object(bound, handler))
    }

    fn release(&self) {
        self.handler.lock().take();
    }
}

impl HostTimerHandler for TimerHandlerWrapper {
    fn on_timer(&self) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler.on_timer();
        }
    }
}

/// Toolkit run loop backed by the host's run loop.
///
/// Registration calls are expected on the host's UI thread. The registries
/// are still locked internally, but the lock is never held across a call
/// into the host.
pub struct RunLoopBridge {
    host: Option<Arc<dyn HostRunLoop>>,
    event_handlers: Mutex<Vec<Arc<EventHandlerWrapper>>>,
    timer_handlers: Mutex<Vec<Arc<TimerHandlerWrapper>>>,
}

impl RunLoopBridge {
    /// Wraps the host run loop. `None` stands for a host that did not provide
    /// one; every operation then fails.
    pub fn new(host: Option<Arc<dyn HostRunLoop>>) -> Self {
        if host.is_none() {
            warn!("host did not provide a run loop; editor events will not be dispatched");
        }
        Self {
            host,
            event_handlers: Mutex::new(Vec::new()),
            timer_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn has_host_run_loop(&self) -> bool {
        self.host.is_some()
    }

    pub fn event_handler_count(&self) -> usize {
        self.event_handlers.lock().len()
    }

    pub fn timer_count(&self) -> usize {
        self.timer_handlers.lock().len()
    }
}

impl ToolkitRunLoop for RunLoopBridge {
    fn register_event_handler(
        &self,
        fd: FileDescriptor,
        handler: Arc<dyn ToolkitEventHandler>,
    ) -> bool {
        let Some(host) = &self.host else {
            return false;
        };

        let wrapper = Arc::new(EventHandlerWrapper::new(fd, handler));
        let result = host.register_event_handler(wrapper.clone(), fd);
        if !result.is_ok() {
            warn!(fd, ?result, "host rejected event handler registration");
            wrapper.release();
            return false;
        }

        debug!(fd, "registered editor event handler");
        self.event_handlers.lock().push(wrapper);
        true
    }

    fn unregister_event_handler(&self, handler: &Arc<dyn ToolkitEventHandler>) -> bool {
        let Some(host) = &self.host else {
            return false;
        };

        let removed = {
            let mut handlers = self.event_handlers.lock();
            handlers
                .iter()
                .position(|wrapper| wrapper.is_bound_to(handler))
                .map(|index| handlers.remove(index))
        };
        let Some(wrapper) = removed else {
            return false;
        };

        let fd = wrapper.fd();
        let host_handler: Arc<dyn HostEventHandler> = wrapper.clone();
        let result = host.unregister_event_handler(&host_handler);
        if !result.is_ok() {
            debug!(fd, ?result, "host reported failure unregistering event handler");
        }
        wrapper.release();
        debug!(fd, "unregistered editor event handler");
        true
    }

    fn register_timer(&self, interval_ms: u64, handler: Arc<dyn ToolkitTimerHandler>) -> bool {
        let Some(host) = &self.host else {
            return false;
        };

        let wrapper = Arc::new(TimerHandlerWrapper::new(interval_ms, handler));
        let result = host.register_timer(wrapper.clone(), interval_ms);
        if !result.is_ok() {
            warn!(interval_ms, ?result, "host rejected timer registration");
            wrapper.release();
            return false;
        }

        debug!(interval_ms, "registered editor timer");
        self.timer_handlers.lock().push(wrapper);
        true
    }

    fn unregister_timer(&self, handler: &Arc<dyn ToolkitTimerHandler>) -> bool {
        let Some(host) = &self.host else {
            return false;
        };

        let removed = {
            let mut handlers = self.timer_handlers.lock();
            handlers
                .iter()
                .position(|wrapper| wrapper.is_bound_to(handler))
                .map(|index| handlers.remove(index))
        };
        let Some(wrapper) = removed else {
            return false;
        };

        let interval_ms = wrapper.interval_ms();
        let host_handler: Arc<dyn HostTimerHandler> = wrapper.clone();
        let result = host.unregister_timer(&host_handler);
        if !result.is_ok() {
            debug!(interval_ms, ?result, "host reported failure unregistering timer");
        }
        wrapper.release();
        debug!(interval_ms, "unregistered editor timer");
        true
    }
}

impl Drop for RunLoopBridge {
    fn drop(&mut self) {
        let events = std::mem::take(self.event_handlers.get_mut());
        let timers = std::mem::take(self.timer_handlers.get_mut());
        if !events.is_empty() || !timers.is_empty() {
            debug!(
                events = events.len(),
                timers = timers.len(),
                "releasing editor handlers still registered at bridge teardown"
            );
        }
        events.iter().for_each(|wrapper| wrapper.release());
        timers.iter().for_each(|wrapper| wrapper.release());
    }
}

impl fmt::Debug for RunLoopBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoopBridge")
            .field("has_host_run_loop", &self.has_host_run_loop())
            .field("event_handlers", &self.event_handler_count())
            .field("timer_handlers", &self.timer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ToolkitEventHandler for Counter {
        fn on_event(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn released_wrapper_ignores_host_callbacks() {
        let counter = Arc::new(Counter::default());
        let wrapper = EventHandlerWrapper::new(3, counter.clone());

        wrapper.on_fd_is_set(3);
        wrapper.release();
        wrapper.on_fd_is_set(3);

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrapper_matches_handler_by_allocation() {
        let first: Arc<dyn ToolkitEventHandler> = Arc::new(Counter::default());
        let second: Arc<dyn ToolkitEventHandler> = Arc::new(Counter::default());
        let wrapper = EventHandlerWrapper::new(7, first.clone());

        assert!(wrapper.is_bound_to(&first));
        assert!(!wrapper.is_bound_to(&second));
    }
}
