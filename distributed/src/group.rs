//! The process-wide default process group.

use std::sync::Arc;

use log::info;
use parking_lot::{RwLock, const_rwlock};

use crate::{
    error::{DistributedError, Result},
    transport::Transport,
};

static DEFAULT_GROUP: RwLock<Option<Arc<dyn Transport>>> = const_rwlock(None);

/// Installs `transport` as this process's default group.
///
/// # Errors
/// `DistributedError::Collective` if a default group is already installed.
pub fn init_process_group(transport: Arc<dyn Transport>) -> Result<()> {
    let mut group = DEFAULT_GROUP.write();
    if group.is_some() {
        return Err(DistributedError::collective(
            "init_process_group",
            "default process group is already initialized",
        ));
    }

    info!(
        rank = transport.rank(),
        world_size = transport.world_size();
        "initialized default process group"
    );
    *group = Some(transport);
    Ok(())
}

/// Returns true if a default group is installed.
pub fn is_initialized() -> bool {
    DEFAULT_GROUP.read().is_some()
}

/// Returns the default group.
///
/// # Errors
/// `DistributedError::NotInitialized` if none is installed.
pub fn default_group() -> Result<Arc<dyn Transport>> {
    DEFAULT_GROUP.read().clone().ok_or(DistributedError::NotInitialized)
}

/// Uninstalls the default group and destroys this process's member.
///
/// # Errors
/// `DistributedError::NotInitialized` if none is installed.
pub fn destroy_process_group() -> Result<()> {
    let group = DEFAULT_GROUP.write().take().ok_or(DistributedError::NotInitialized)?;
    info!(rank = group.rank(); "destroying default process group");
    group.destroy()
}

/// Uninstalls the default group if it is `transport`, without destroying it.
///
/// # Returns
/// True if `transport` was the default group.
pub(crate) fn uninstall(transport: &Arc<dyn Transport>) -> bool {
    let mut group = DEFAULT_GROUP.write();
    if !group.as_ref().is_some_and(|installed| Arc::ptr_eq(installed, transport)) {
        return false;
    }

    info!(rank = transport.rank(); "uninstalling default process group");
    *group = None;
    true
}
