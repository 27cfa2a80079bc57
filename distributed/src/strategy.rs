use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Gathers a buffer from every worker of the default group, indexed by rank.
pub type GatherFn = fn(&[f32]) -> Result<Vec<Vec<f32>>>;

/// A trainable model as seen by a distribution strategy: flat parameter and
/// gradient buffers.
pub trait Model: Send {
    fn parameters(&self) -> &[f32];

    fn parameters_mut(&mut self) -> &mut [f32];

    fn gradients(&self) -> &[f32];

    fn gradients_mut(&mut self) -> &mut [f32];

    /// Called after the backward pass, before the optimizer step.
    ///
    /// A plain model has nothing to synchronize. Wrappers returned by
    /// [`DistributedStrategy::wrap_model`] reduce the gradients across workers.
    fn synchronize_gradients(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Updates a model's parameters from its gradients.
pub trait Optimizer: Send {
    fn step(&mut self, parameters: &mut [f32], gradients: &[f32]);

    /// The optimizer's flat state, if it keeps any.
    fn state_mut(&mut self) -> &mut [f32] {
        &mut []
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn parameters(&self) -> &[f32] {
        (**self).parameters()
    }

    fn parameters_mut(&mut self) -> &mut [f32] {
        (**self).parameters_mut()
    }

    fn gradients(&self) -> &[f32] {
        (**self).gradients()
    }

    fn gradients_mut(&mut self) -> &mut [f32] {
        (**self).gradients_mut()
    }

    fn synchronize_gradients(&mut self) -> Result<()> {
        (**self).synchronize_gradients()
    }
}

/// The distribution backend a trainer runs under.
///
/// Collectives block and must be issued by every worker in the same order.
pub trait DistributedStrategy: Send + Sync {
    /// The amount of workers.
    fn size(&self) -> usize;

    /// This worker's global rank.
    fn rank(&self) -> usize;

    /// The amount of workers on this worker's host.
    fn local_size(&self) -> usize;

    /// This worker's rank among the workers on its host.
    fn local_rank(&self) -> usize;

    fn barrier(&self) -> Result<()>;

    /// Sums `buf` across every worker, in place.
    fn allreduce<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]>;

    /// Overwrites `buf` with rank 0's buffer, in place.
    fn broadcast<'a>(&self, buf: &'a mut [f32]) -> Result<&'a mut [f32]>;

    /// Returns rank 0's `value` on every worker.
    fn broadcast_object<T>(&self, value: T) -> Result<T>
    where
        Self: Sized,
        T: Serialize + DeserializeOwned;

    fn wrap_model(&self, model: Box<dyn Model>) -> Box<dyn Model>;

    fn wrap_optimizer(
        &self,
        optimizer: Box<dyn Optimizer>,
        model: &dyn Model,
    ) -> Box<dyn Optimizer>;

    /// Makes every worker start from the same parameters.
    fn sync_model(&self, model: &mut dyn Model) -> Result<()>;

    /// Makes every worker start from the same optimizer state.
    fn sync_optimizer(&self, optimizer: &mut dyn Optimizer) -> Result<()>;

    /// Blocks until asynchronous gradient reductions issued by `optimizer`
    /// have landed. Backends that reduce synchronously have nothing to wait for.
    fn wait_optimizer_synced(&self, _optimizer: &mut dyn Optimizer) -> Result<()> {
        Ok(())
    }

    /// Runs `update` on `optimizer` while holding whatever the backend needs
    /// held during an optimizer step. The hold is released when `update`
    /// returns or unwinds.
    fn prepare_optimizer_update<R, F>(&self, optimizer: &mut dyn Optimizer, update: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut dyn Optimizer) -> R;

    /// Returns true if this backend can be used in the current process.
    fn is_available() -> bool
    where
        Self: Sized;

    /// The function metrics use to gather per-worker values, if the backend
    /// is distributed.
    fn gather_all_tensors_fn() -> Option<GatherFn>
    where
        Self: Sized;

    /// Releases the backend. Safe to call more than once.
    fn shutdown(&self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A model with explicit parameter and gradient vectors.
    pub(crate) struct VecModel {
        pub(crate) params: Vec<f32>,
        pub(crate) grads: Vec<f32>,
    }

    impl VecModel {
        pub(crate) fn new(params: Vec<f32>, grads: Vec<f32>) -> Self {
            Self { params, grads }
        }
    }

    impl Model for VecModel {
        fn parameters(&self) -> &[f32] {
            &self.params
        }

        fn parameters_mut(&mut self) -> &mut [f32] {
            &mut self.params
        }

        fn gradients(&self) -> &[f32] {
            &self.grads
        }

        fn gradients_mut(&mut self) -> &mut [f32] {
            &mut self.grads
        }
    }

    /// Plain gradient descent with a step counter as state.
    pub(crate) struct Sgd {
        pub(crate) lr: f32,
        pub(crate) state: Vec<f32>,
    }

    impl Optimizer for Sgd {
        fn step(&mut self, parameters: &mut [f32], gradients: &[f32]) {
            for (p, g) in parameters.iter_mut().zip(gradients) {
                *p -= self.lr * g;
            }
            self.state[0] += 1.0;
        }

        fn state_mut(&mut self) -> &mut [f32] {
            &mut self.state
        }
    }

    #[test]
    fn test_boxed_model_delegates() {
        let mut model: Box<dyn Model> = Box::new(VecModel::new(vec![1.0], vec![0.5]));
        model.parameters_mut()[0] = 2.0;

        assert_eq!(model.parameters(), &[2.0]);
        assert_eq!(model.gradients(), &[0.5]);
        assert!(model.synchronize_gradients().is_ok());
    }
}
