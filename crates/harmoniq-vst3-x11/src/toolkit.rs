//! Interfaces the editor GUI toolkit expects from its X11 platform layer.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::host::FileDescriptor;

/// Toolkit callback fired when a watched descriptor has data.
pub trait ToolkitEventHandler: Send + Sync {
    fn on_event(&self);
}

/// Toolkit callback fired when a timer elapses.
pub trait ToolkitTimerHandler: Send + Sync {
    fn on_timer(&self);
}

/// Run-loop capabilities the toolkit uses to watch its X connection and
/// drive its timers.
///
/// Every call reports success as a plain boolean; the toolkit degrades on
/// `false` by itself.
pub trait ToolkitRunLoop: Send + Sync {
    fn register_event_handler(
        &self,
        fd: FileDescriptor,
        handler: Arc<dyn ToolkitEventHandler>,
    ) -> bool;
    fn unregister_event_handler(&self, handler: &Arc<dyn ToolkitEventHandler>) -> bool;
    fn register_timer(&self, interval_ms: u64, handler: Arc<dyn ToolkitTimerHandler>) -> bool;
    fn unregister_timer(&self, handler: &Arc<dyn ToolkitTimerHandler>) -> bool;
}

/// Kind of native handle a surface is parented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    /// Parent is an X11 window id (`kX11EmbedWindowID` in VST3 terms).
    X11Window,
    /// Parent is an opaque toolkit-specific handle.
    Native,
}

/// Native parent window handed over by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentWindow(pub u64);

impl ParentWindow {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Platform resources passed to a surface when it is opened.
#[derive(Clone)]
pub struct FrameConfig {
    /// Run loop the surface must use for all X event and timer handling.
    pub run_loop: Arc<dyn ToolkitRunLoop>,
}

impl fmt::Debug for FrameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameConfig")
            .field("run_loop", &Arc::as_ptr(&self.run_loop).cast::<()>())
            .finish()
    }
}

/// An editor frame that can be attached to a host-provided parent window.
pub trait EditorSurface {
    fn open(
        &self,
        parent: ParentWindow,
        platform: PlatformType,
        config: &FrameConfig,
    ) -> Result<()>;
}
