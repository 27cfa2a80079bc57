use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{DistributedError, Result},
    group,
    strategy::{DistributedStrategy, GatherFn, Model, Optimizer},
    topology::{self, local_rank_and_size},
    transport::Transport,
};

/// How long `shutdown` waits for the process group teardown by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

const ROOT: usize = 0;

/// Data-parallel training over a process group: every worker holds a full
/// replica and gradients are averaged across workers after each backward pass.
pub struct DdpStrategy {
    group: Arc<dyn Transport>,
    local_rank: usize,
    local_size: usize,
    shutdown_timeout: Duration,
    shut_down: AtomicBool,
    update_lock: Mutex<()>,
}

impl DdpStrategy {
    /// Creates a `DdpStrategy` over the default process group.
    ///
    /// Collective: every worker of the group must call it.
    ///
    /// # Errors
    /// `DistributedError::NotInitialized` if there's no default group.
    pub fn new() -> Result<Self> {
        Self::with_group(group::default_group()?)
    }

    /// Creates a `DdpStrategy` over `group`, identifying this worker's host
    /// with [`topology::host_id`].
    pub fn with_group(group: Arc<dyn Transport>) -> Result<Self> {
        Self::with_host(group, &topology::host_id())
    }

    /// Creates a `DdpStrategy` over `group` for a worker running on `host`.
    ///
    /// # Arguments
    /// * `group` - This worker's member of the process group.
    /// * `host` - The host identifier the local topology is computed from.
    ///
    /// # Errors
    /// Any failure of the topology all-gather.
    pub fn with_host(group: Arc<dyn Transport>, host: &str) -> Result<Self> {
        let (local_rank, local_size) = local_rank_and_size(group.as_ref(), host)?;

        info!(
            rank = group.rank(),
            world_size = group.world_size(),
            local_rank = local_rank,
            local_size = local_size;
            "using ddp strategy"
        );

        Ok(Self {
            group,
            local_rank,
            local_size,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            shut_down: AtomicBool::new(false),
            update_lock: Mutex::new(()),
        })
    }

    /// Sets how long `shutdown` waits for the teardown before abandoning it.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// A model replica whose gradients are averaged across the process group.
pub struct DdpModel {
    inner: Box<dyn Model>,
    group: Arc<dyn Transport>,
}

impl Model for DdpModel {
    fn parameters(&self) -> &[f32] {
        self.inner.parameters()
    }

    fn parameters_mut(&mut self) -> &mut [f32] {
        self.inner.parameters_mut()
    }

    fn gradients(&self) -> &[f32] {
        self.inner.gradients()
    }

    fn gradients_mut(&mut self) -> &mut [f32] {
        self.inner.gradients_mut()
    }

    fn synchronize_gradients(&mut self) -> Result<()> {
        self.inner.synchronize_gradients()?;

        let world_size = self.group.world_size() as f32;
        let grads = self.inner.gradients_mut();
        self.group.all_reduce(grads)?;
        grads.iter_mut().for_each(|g| *g /= world_size);

        Ok(())
    }
}

fn gather_all_tensors(buf: &[f32]) -> Result<Vec<Vec<f32>>> {
    group::default_group()?.all_gather(buf)
}

impl DistributedStrategy for DdpStrategy {
    fn size(&self) -> usize {
        self.group.world_size()
    }

    fn rank(&self) -> usize {
        self.group.rank()
    }

    fn local_size(&self) -> usize {
        self.local_size
    }

    fn local_rank(&self) -> usize {
        self.local_rank
    }

    fn barrier(&self) -> Result<()> {
        self.group.barrier()
    }

    fn allreduce<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]> {
        self.group.all_reduce(buf)?;
        Ok(buf)
    }

    fn broadcast<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]> {
        self.group.broadcast(buf, ROOT)?;
        Ok(buf)
    }

    fn broadcast_object<T>(&self, value: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let bytes = serde_json::to_vec(&value)?;
        let bytes = self.group.broadcast_bytes(bytes, ROOT)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn wrap_model(&self, model: Box<dyn Model>) -> Box<dyn Model> {
        Box::new(DdpModel {
            inner: model,
            group: Arc::clone(&self.group),
        })
    }

    fn wrap_optimizer(
        &self,
        optimizer: Box<dyn Optimizer>,
        _model: &dyn Model,
    ) -> Box<dyn Optimizer> {
        optimizer
    }

    fn sync_model(&self, model: &mut dyn Model) -> Result<()> {
        self.group.broadcast(model.parameters_mut(), ROOT)?;
        debug!(rank = self.rank(); "synchronized model parameters");
        Ok(())
    }

    fn sync_optimizer(&self, optimizer: &mut dyn Optimizer) -> Result<()> {
        self.group.broadcast(optimizer.state_mut(), ROOT)?;
        debug!(rank = self.rank(); "synchronized optimizer state");
        Ok(())
    }

    fn prepare_optimizer_update<R, F>(&self, optimizer: &mut dyn Optimizer, update: F) -> R
    where
        F: FnOnce(&mut dyn Optimizer) -> R,
    {
        let _guard = self.update_lock.lock();
        update(optimizer)
    }

    fn is_available() -> bool {
        group::is_initialized()
    }

    fn gather_all_tensors_fn() -> Option<GatherFn> {
        Some(gather_all_tensors)
    }

    /// Tears down this worker's group member, waiting at most the shutdown
    /// timeout.
    ///
    /// If the member is the default process group it is uninstalled first,
    /// the way `destroy_process_group` does. A teardown that doesn't finish in
    /// time is abandoned: the member is leaked and the caller is released.
    fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        group::uninstall(&self.group);

        let group = Arc::clone(&self.group);
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("ddp-teardown".to_string())
            .spawn(move || {
                let _ = tx.send(group.destroy());
            })
            .map_err(|e| DistributedError::collective("shutdown", e.to_string()))?;

        match rx.recv_timeout(self.shutdown_timeout) {
            Ok(result) => {
                info!(rank = self.rank(); "ddp strategy shut down");
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    rank = self.rank(),
                    timeout_ms = self.shutdown_timeout.as_millis() as u64;
                    "process group teardown timed out, abandoning it"
                );
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => Err(DistributedError::collective(
                "shutdown",
                "teardown thread exited without reporting",
            )),
        }
    }
}
