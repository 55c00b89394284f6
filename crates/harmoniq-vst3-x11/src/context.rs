use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use crate::bridge::RunLoopBridge;
use crate::config::BridgeConfig;
use crate::host::{DeferredUpdates, HostRunLoop};
use crate::idle::IdleUpdateDriver;
use crate::toolkit::{EditorSurface, FrameConfig, ParentWindow, PlatformType, ToolkitRunLoop};

struct IdleSlot {
    driver: Arc<IdleUpdateDriver>,
    // Set while the driver still belongs to a previous context's editors.
    inherited: bool,
}

/// Everything a plugin instance needs to run editors inside a Linux host:
/// the run-loop bridge handed to every opened surface and the shared idle
/// update driver.
pub struct PluginGuiContext {
    bridge: Arc<RunLoopBridge>,
    updates: Arc<dyn DeferredUpdates>,
    config: BridgeConfig,
    idle: Mutex<IdleSlot>,
}

impl PluginGuiContext {
    /// Wraps the host run loop and prepares an idle driver flushing `updates`.
    pub fn init(
        host_run_loop: Option<Arc<dyn HostRunLoop>>,
        updates: Arc<dyn DeferredUpdates>,
        config: BridgeConfig,
    ) -> Result<Self> {
        let driver = IdleUpdateDriver::new(Arc::clone(&updates), &config)
            .context("refusing to initialise editor run loop")?;
        Ok(Self::assemble(host_run_loop, updates, config, driver, false))
    }

    /// Like [`PluginGuiContext::init`], but keeps `previous` until its open
    /// editors have all detached. The next editor opened after that gets a
    /// driver built from `updates` and `config`.
    pub fn inherit(
        host_run_loop: Option<Arc<dyn HostRunLoop>>,
        updates: Arc<dyn DeferredUpdates>,
        config: BridgeConfig,
        previous: Arc<IdleUpdateDriver>,
    ) -> Result<Self> {
        config
            .validate()
            .context("refusing to initialise editor run loop")?;
        Ok(Self::assemble(host_run_loop, updates, config, previous, true))
    }

    fn assemble(
        host_run_loop: Option<Arc<dyn HostRunLoop>>,
        updates: Arc<dyn DeferredUpdates>,
        config: BridgeConfig,
        driver: impl Into<Arc<IdleUpdateDriver>>,
        inherited: bool,
    ) -> Self {
        Self {
            bridge: Arc::new(RunLoopBridge::new(host_run_loop)),
            updates,
            config,
            idle: Mutex::new(IdleSlot {
                driver: driver.into(),
                inherited,
            }),
        }
    }

    pub fn bridge(&self) -> &Arc<RunLoopBridge> {
        &self.bridge
    }

    /// The idle driver editors of this context currently attach to.
    pub fn idle_driver(&self) -> Arc<IdleUpdateDriver> {
        Arc::clone(&self.idle.lock().driver)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Platform configuration pointing surfaces at this context's run loop.
    pub fn frame_config(&self) -> FrameConfig {
        let run_loop: Arc<dyn ToolkitRunLoop> = self.bridge.clone();
        FrameConfig { run_loop }
    }

    /// Opens `surface` under `parent` and registers it as an idle client.
    pub fn frame_open<S>(
        &self,
        surface: &S,
        parent: ParentWindow,
        platform: PlatformType,
    ) -> Result<()>
    where
        S: EditorSurface + ?Sized,
    {
        let config = self.frame_config();
        surface
            .open(parent, platform, &config)
            .with_context(|| {
                format!("failed to open editor surface in window {:#x}", parent.raw())
            })?;

        let mut idle = self.idle.lock();
        if idle.inherited && idle.driver.clients() == 0 {
            debug!("replacing idle driver left over from a previous initialisation");
            let driver = IdleUpdateDriver::new(Arc::clone(&self.updates), &self.config)
                .context("failed to build idle update driver")?;
            *idle = IdleSlot {
                driver: Arc::new(driver),
                inherited: false,
            };
        }
        idle.driver
            .start()
            .context("failed to start idle updates for editor surface")?;
        debug!(
            parent = parent.raw(),
            clients = idle.driver.clients(),
            "editor surface opened"
        );
        Ok(())
    }

    /// Releases one idle client. Joins the idle thread when it was the last.
    pub fn detach(&self) {
        let driver = self.idle_driver();
        let joined = driver.stop();
        debug!(joined, clients = driver.clients(), "editor surface detached");
    }
}

impl std::fmt::Debug for PluginGuiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let idle = self.idle.lock();
        f.debug_struct("PluginGuiContext")
            .field("bridge", &self.bridge)
            .field("config", &self.config)
            .field("idle", &idle.driver)
            .field("idle_inherited", &idle.inherited)
            .finish()
    }
}
