use std::io;

use thiserror::Error;

/// Errors raised by the editor lifecycle layer.
///
/// Run-loop registration never produces these; it reports plain booleans to
/// the toolkit.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to spawn idle update thread: {0}")]
    IdleThreadSpawn(#[source] io::Error),
    #[error("editor run loop has not been initialised")]
    NotInitialized,
    #[error("invalid bridge configuration: {0}")]
    InvalidConfig(String),
}
