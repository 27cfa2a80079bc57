use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::Result,
    strategy::{DistributedStrategy, GatherFn, Model, Optimizer},
};

/// Single-process training: one worker, collectives are the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStrategy;

impl DistributedStrategy for LocalStrategy {
    fn size(&self) -> usize {
        1
    }

    fn rank(&self) -> usize {
        0
    }

    fn local_size(&self) -> usize {
        1
    }

    fn local_rank(&self) -> usize {
        0
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn allreduce<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]> {
        Ok(buf)
    }

    fn broadcast<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]> {
        Ok(buf)
    }

    fn broadcast_object<T>(&self, value: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Ok(value)
    }

    fn wrap_model(&self, model: Box<dyn Model>) -> Box<dyn Model> {
        model
    }

    fn wrap_optimizer(
        &self,
        optimizer: Box<dyn Optimizer>,
        _model: &dyn Model,
    ) -> Box<dyn Optimizer> {
        optimizer
    }

    fn sync_model(&self, _model: &mut dyn Model) -> Result<()> {
        Ok(())
    }

    fn sync_optimizer(&self, _optimizer: &mut dyn Optimizer) -> Result<()> {
        Ok(())
    }

    fn prepare_optimizer_update<R, F>(&self, optimizer: &mut dyn Optimizer, update: F) -> R
    where
        F: FnOnce(&mut dyn Optimizer) -> R,
    {
        update(optimizer)
    }

    fn is_available() -> bool {
        true
    }

    fn gather_all_tensors_fn() -> Option<GatherFn> {
        None
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
