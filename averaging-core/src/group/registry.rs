//! Process-wide default ("world") group registry.
//!
//! Training code often wants a single ambient group shared by every
//! component in the process. Rather than an implicit global that springs
//! into existence on first use, the world group here has an explicit
//! lifecycle:
//!
//! 1. [`init_world`] installs a group, exactly once.
//! 2. [`world`] hands out the installed group; it is an error to call it
//!    before initialization.
//! 3. [`shutdown_world`] removes the group (idempotent), after which
//!    [`init_world`] may be called again.
//!
//! Averagers resolve the world group at construction time via
//! `PeriodicModelAverager::with_world`, so a process that never touches
//! the registry pays nothing for it.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AveragingError, Result};
use crate::group::ProcessGroup;

static WORLD: RwLock<Option<Arc<dyn ProcessGroup>>> = RwLock::new(None);

/// Installs `group` as the process-wide default group.
///
/// # Errors
///
/// Returns a registry error if a world group is already installed. Call
/// [`shutdown_world`] first to replace it.
pub fn init_world(group: Arc<dyn ProcessGroup>) -> Result<()> {
    let mut world = WORLD.write();
    if world.is_some() {
        return Err(AveragingError::registry(
            "world group is already initialized",
        ));
    }
    tracing::debug!(size = group.size(), "installing world process group");
    *world = Some(group);
    Ok(())
}

/// Returns the process-wide default group.
///
/// # Errors
///
/// Returns a registry error if [`init_world`] has not been called.
pub fn world() -> Result<Arc<dyn ProcessGroup>> {
    WORLD.read().as_ref().cloned().ok_or_else(|| {
        AveragingError::registry("world group is not initialized; call init_world first")
    })
}

/// Removes the process-wide default group, if any.
///
/// Averagers holding the group keep their handle; only future [`world`]
/// lookups are affected.
pub fn shutdown_world() {
    let mut world = WORLD.write();
    if world.take().is_some() {
        tracing::debug!("world process group removed");
    }
}

/// Whether a world group is currently installed.
pub fn is_initialized() -> bool {
    WORLD.read().is_some()
}
