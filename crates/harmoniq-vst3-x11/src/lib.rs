//! Harmoniq Studio VST3 editor support for Linux hosts.
//!
//! VST3 hosts on Linux own the event loop and hand plugin editors an
//! `IRunLoop` to register file descriptors and timers with. This crate adapts
//! that run loop to the run-loop interface our editor toolkit expects from its
//! X11 platform layer, and keeps a small background thread flushing deferred
//! GUI updates while at least one editor surface is open.
//!
//! The usual lifecycle is `init` once per plugin with the host run loop,
//! `frame_open` per attached editor and `detach` per closed editor, either on
//! an explicit [`PluginGuiContext`] or through the process-wide [`global`]
//! entry points.

pub mod bridge;
pub mod config;
pub mod context;
mod error;
pub mod global;
pub mod host;
pub mod idle;
pub mod toolkit;
pub mod updates;

pub use bridge::{EventHandlerWrapper, RunLoopBridge, TimerHandlerWrapper};
pub use config::BridgeConfig;
pub use context::PluginGuiContext;
pub use error::BridgeError;
pub use host::{
    DeferredUpdates, FileDescriptor, HostEventHandler, HostResult, HostRunLoop, HostTimerHandler,
};
pub use idle::IdleUpdateDriver;
pub use toolkit::{
    EditorSurface, FrameConfig, ParentWindow, PlatformType, ToolkitEventHandler, ToolkitRunLoop,
    ToolkitTimerHandler,
};
pub use updates::DeferredUpdateQueue;
