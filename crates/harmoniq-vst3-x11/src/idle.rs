//! Background thread flushing deferred GUI updates while editors are open.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::host::DeferredUpdates;

struct IdleThread {
    running: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Reference-counted driver for the idle update thread.
///
/// The first `start` spawns the thread, the matching last `stop` joins it.
pub struct IdleUpdateDriver {
    updates: Arc<dyn DeferredUpdates>,
    interval: Duration,
    thread_name: String,
    users: AtomicU32,
    // Guards count transitions together with spawn and handle takeover. Never
    // held across a join.
    thread: Mutex<Option<IdleThread>>,
}

impl IdleUpdateDriver {
    /// Builds a stopped driver. Fails when `config` does not validate.
    pub fn new(
        updates: Arc<dyn DeferredUpdates>,
        config: &BridgeConfig,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self {
            updates,
            interval: config.idle_interval,
            thread_name: config.thread_name.clone(),
            users: AtomicU32::new(0),
            thread: Mutex::new(None),
        })
    }

    /// Adds a client. Returns `true` when this call spawned the thread.
    pub fn start(&self) -> Result<bool, BridgeError> {
        let mut slot = self.thread.lock();
        if self.users.fetch_add(1, Ordering::SeqCst) != 0 {
            return Ok(false);
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let updates = Arc::clone(&self.updates);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    updates.trigger_deferred_updates();
                    thread::park_timeout(interval);
                }
            });

        match spawned {
            Ok(handle) => {
                debug!(interval = ?self.interval, "idle update thread started");
                *slot = Some(IdleThread { running, handle });
                Ok(true)
            }
            Err(err) => {
                self.users.fetch_sub(1, Ordering::SeqCst);
                Err(BridgeError::IdleThreadSpawn(err))
            }
        }
    }

    /// Drops a client. Returns `true` when this call joined the thread.
    pub fn stop(&self) -> bool {
        let idle = {
            let mut slot = self.thread.lock();
            let previous = self
                .users
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |users| {
                    users.checked_sub(1)
                });
            match previous {
                Err(_) => {
                    warn!("idle update driver stopped more often than it was started");
                    return false;
                }
                Ok(users) if users > 1 => return false,
                Ok(_) => {}
            }
            slot.take()
        };
        let Some(IdleThread { running, handle }) = idle else {
            return false;
        };

        running.store(false, Ordering::SeqCst);
        if handle.thread().id() == thread::current().id() {
            warn!("idle update thread asked to stop itself; detaching instead of joining");
            return false;
        }

        handle.thread().unpark();
        if handle.join().is_err() {
            warn!("idle update thread panicked");
        }
        info!("idle update thread stopped");
        true
    }

    /// Number of clients currently holding the driver.
    pub fn clients(&self) -> u32 {
        self.users.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|idle| idle.running.load(Ordering::SeqCst))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl fmt::Debug for IdleUpdateDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleUpdateDriver")
            .field("interval", &self.interval)
            .field("thread_name", &self.thread_name)
            .field("clients", &self.clients())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for IdleUpdateDriver {
    fn drop(&mut self) {
        if let Some(IdleThread { running, handle }) = self.thread.get_mut().take() {
            running.store(false, Ordering::SeqCst);
            if handle.thread().id() == thread::current().id() {
                return;
            }
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Default)]
    struct CountingUpdates {
        flushes: AtomicUsize,
    }

    impl DeferredUpdates for CountingUpdates {
        fn trigger_deferred_updates(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn driver(updates: Arc<CountingUpdates>) -> IdleUpdateDriver {
        let config = BridgeConfig::new().idle_interval(Duration::from_millis(1));
        IdleUpdateDriver::new(updates, &config).unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn start_flushes_until_stopped() {
        let updates = Arc::new(CountingUpdates::default());
        let driver = driver(updates.clone());

        assert!(driver.start().unwrap());
        assert!(wait_for(|| updates.flushes.load(Ordering::SeqCst) >= 3));
        assert!(driver.stop());

        let after_stop = updates.flushes.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(updates.flushes.load(Ordering::SeqCst), after_stop);
        assert!(!driver.is_running());
    }

    #[test]
    fn unbalanced_stop_is_ignored() {
        let driver = driver(Arc::new(CountingUpdates::default()));
        assert!(!driver.stop());
        assert_eq!(driver.clients(), 0);

        assert!(driver.start().unwrap());
        assert_eq!(driver.clients(), 1);
        assert!(driver.stop());
    }

    #[test]
    fn stop_wakes_thread_before_long_interval_elapses() {
        let updates = Arc::new(CountingUpdates::default());
        let config = BridgeConfig::new().idle_interval(Duration::from_secs(30));
        let driver = IdleUpdateDriver::new(updates.clone(), &config).unwrap();

        driver.start().unwrap();
        assert!(wait_for(|| updates.flushes.load(Ordering::SeqCst) >= 1));

        let began = Instant::now();
        assert!(driver.stop());
        assert!(began.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn invalid_thread_name_is_rejected_before_any_client_is_counted() {
        let config = BridgeConfig::new().thread_name("idle\0updates");
        let updates = Arc::new(CountingUpdates::default());
        let err = IdleUpdateDriver::new(updates, &config).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig(_)));
    }

    /// Runs a nested start/stop from inside the flush that is in flight while
    /// the last client detaches.
    struct ReentrantUpdates {
        driver: Mutex<Option<std::sync::Weak<IdleUpdateDriver>>>,
        armed: AtomicBool,
        reentered: AtomicBool,
    }

    impl DeferredUpdates for ReentrantUpdates {
        fn trigger_deferred_updates(&self) {
            if !self.armed.load(Ordering::SeqCst) {
                return;
            }
            if self.reentered.swap(true, Ordering::SeqCst) {
                return;
            }
            let driver = self.driver.lock().as_ref().and_then(|weak| weak.upgrade());
            if let Some(driver) = driver {
                // Give the detaching thread time to reach the join.
                thread::sleep(Duration::from_millis(20));
                driver.start().unwrap();
                driver.stop();
            }
        }
    }

    #[test]
    fn flush_may_restart_driver_while_last_client_detaches() {
        let updates = Arc::new(ReentrantUpdates {
            driver: Mutex::new(None),
            armed: AtomicBool::new(false),
            reentered: AtomicBool::new(false),
        });
        let config = BridgeConfig::new().idle_interval(Duration::from_millis(1));
        let driver = Arc::new(IdleUpdateDriver::new(updates.clone(), &config).unwrap());
        *updates.driver.lock() = Some(Arc::downgrade(&driver));

        driver.start().unwrap();
        updates.armed.store(true, Ordering::SeqCst);
        assert!(wait_for(|| updates.reentered.load(Ordering::SeqCst)));

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let stopper = Arc::clone(&driver);
        thread::spawn(move || {
            stopper.stop();
            let _ = done_tx.send(());
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(wait_for(|| driver.clients() == 0 && !driver.is_running()));
        updates.driver.lock().take();
    }
}
