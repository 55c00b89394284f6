//! Process-wide entry points for plugins that cannot thread a
//! [`PluginGuiContext`] through their editor code.
//!
//! Call [`init`] once with the host run loop, [`frame_open`] for every editor
//! surface that gets attached, and [`detach`] for every one that goes away.

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::context::PluginGuiContext;
use crate::error::BridgeError;
use crate::host::{DeferredUpdates, HostRunLoop};
use crate::toolkit::{EditorSurface, ParentWindow, PlatformType, ToolkitRunLoop};

static CONTEXT: Lazy<RwLock<Option<Arc<PluginGuiContext>>>> = Lazy::new(|| RwLock::new(None));

/// Installs a bridge around `host_run_loop` as the process-wide run loop.
///
/// When a previous context still has open surfaces its idle driver is kept
/// until they have all detached, so their `detach` calls stay balanced.
/// Editors opened after that use `updates` and `config`.
pub fn init(
    host_run_loop: Option<Arc<dyn HostRunLoop>>,
    updates: Arc<dyn DeferredUpdates>,
    config: BridgeConfig,
) -> Result<Arc<PluginGuiContext>> {
    let mut slot = CONTEXT.write();
    let previous = slot
        .as_ref()
        .map(|previous| previous.idle_driver())
        .filter(|driver| driver.clients() > 0);
    let context = match previous {
        Some(driver) => {
            warn!(
                clients = driver.clients(),
                "re-initialising editor run loop with surfaces still open"
            );
            PluginGuiContext::inherit(host_run_loop, updates, config, driver)?
        }
        None => PluginGuiContext::init(host_run_loop, updates, config)?,
    };
    let context = Arc::new(context);
    *slot = Some(context.clone());
    info!(
        has_host_run_loop = context.bridge().has_host_run_loop(),
        "editor run loop installed"
    );
    Ok(context)
}

/// [`init`] with [`BridgeConfig::from_env`], so hosts can tune the idle
/// interval through `HARMONIQ_VST3_IDLE_INTERVAL_MS`.
pub fn init_from_env(
    host_run_loop: Option<Arc<dyn HostRunLoop>>,
    updates: Arc<dyn DeferredUpdates>,
) -> Result<Arc<PluginGuiContext>> {
    init(host_run_loop, updates, BridgeConfig::from_env())
}

/// The installed context, if [`init`] has run.
pub fn current() -> Option<Arc<PluginGuiContext>> {
    CONTEXT.read().clone()
}

/// The installed toolkit run loop, if [`init`] has run.
pub fn run_loop() -> Option<Arc<dyn ToolkitRunLoop>> {
    current().map(|context| context.frame_config().run_loop)
}

/// Opens `surface` against the installed run loop and starts idle updates.
pub fn frame_open<S>(surface: &S, parent: ParentWindow, platform: PlatformType) -> Result<()>
where
    S: EditorSurface + ?Sized,
{
    let context = current().ok_or(BridgeError::NotInitialized)?;
    context.frame_open(surface, parent, platform)
}

/// Releases the idle client held by one opened surface.
pub fn detach() -> Result<()> {
    let context = current().ok_or(BridgeError::NotInitialized)?;
    context.detach();
    Ok(())
}

/// Removes the installed context. Open surfaces keep the old bridge alive
/// through their frame configuration.
pub fn shutdown() -> Option<Arc<PluginGuiContext>> {
    CONTEXT.write().take()
}
