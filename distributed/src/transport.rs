use std::sync::{
    Arc, Barrier,
    atomic::{AtomicBool, Ordering},
};

use log::debug;
use parking_lot::Mutex;

use crate::error::{DistributedError, Result};

/// A process group: the set of workers taking part in collective operations.
///
/// Every member must issue the same collectives in the same order, collectives
/// block until all members arrive.
pub trait Transport: Send + Sync {
    /// This member's rank in `0..world_size`.
    fn rank(&self) -> usize;

    /// The amount of members in the group.
    fn world_size(&self) -> usize;

    /// Blocks until every member reaches the barrier.
    fn barrier(&self) -> Result<()>;

    /// Sums `buf` element-wise across every member, in place.
    ///
    /// # Errors
    /// `DistributedError::ShapeMismatch` if the members' buffers differ in length.
    fn all_reduce(&self, buf: &mut [f32]) -> Result<()>;

    /// Overwrites `buf` on every member with the contents of `root`'s buffer.
    fn broadcast(&self, buf: &mut [f32], root: usize) -> Result<()>;

    /// Collects every member's `buf`, indexed by rank.
    fn all_gather(&self, buf: &[f32]) -> Result<Vec<Vec<f32>>>;

    /// Collects every member's `bytes`, indexed by rank.
    fn all_gather_bytes(&self, bytes: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Returns `root`'s `bytes` on every member.
    fn broadcast_bytes(&self, bytes: Vec<u8>, root: usize) -> Result<Vec<u8>>;

    /// Tears down this member. Local, it does not wait for the other members.
    ///
    /// Any collective issued by this member afterwards fails with
    /// `DistributedError::Closed`.
    fn destroy(&self) -> Result<()>;
}

struct Shared {
    floats: Mutex<Vec<Option<Vec<f32>>>>,
    bytes: Mutex<Vec<Option<Vec<u8>>>>,
    barrier: Barrier,
}

/// An in-process process group, one member per thread.
///
/// Members exchange data through shared slots indexed by rank, every
/// collective is fenced by two barrier waits: one after all members wrote
/// their slot and one after all members read the others'.
pub struct ThreadGroup {
    rank: usize,
    world_size: usize,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl ThreadGroup {
    /// Creates the members of a group of `world_size` workers.
    ///
    /// # Returns
    /// One member per rank, in rank order. Each should be moved to its own thread.
    pub fn new_group(world_size: usize) -> Vec<Self> {
        let shared = Arc::new(Shared {
            floats: Mutex::new(vec![None; world_size]),
            bytes: Mutex::new(vec![None; world_size]),
            barrier: Barrier::new(world_size),
        });

        debug!(world_size = world_size; "created thread group");

        (0..world_size)
            .map(|rank| Self {
                rank,
                world_size,
                shared: Arc::clone(&shared),
                closed: AtomicBool::new(false),
            })
            .collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DistributedError::Closed);
        }
        Ok(())
    }

    fn check_root(&self, op: &'static str, root: usize) -> Result<()> {
        if root >= self.world_size {
            return Err(DistributedError::collective(
                op,
                format!("root {root} is out of range for world size {}", self.world_size),
            ));
        }
        Ok(())
    }

    /// Publishes `value` in this member's slot and returns every member's value.
    fn exchange<T: Clone>(&self, slots: &Mutex<Vec<Option<T>>>, value: T) -> Result<Vec<T>> {
        self.ensure_open()?;
        slots.lock()[self.rank] = Some(value);
        self.shared.barrier.wait();

        let gathered = slots.lock().iter().cloned().collect::<Option<Vec<_>>>();
        self.shared.barrier.wait();

        gathered.ok_or_else(|| {
            DistributedError::collective("exchange", "a member left its slot empty")
        })
    }
}

impl Transport for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn barrier(&self) -> Result<()> {
        self.ensure_open()?;
        self.shared.barrier.wait();
        Ok(())
    }

    fn all_reduce(&self, buf: &mut [f32]) -> Result<()> {
        let gathered = self.exchange(&self.shared.floats, buf.to_vec())?;

        for other in &gathered {
            if other.len() != buf.len() {
                return Err(DistributedError::ShapeMismatch {
                    op: "all_reduce",
                    got: other.len(),
                    expected: buf.len(),
                });
            }
        }

        // Sum in rank order so every member computes bit-identical results.
        buf.fill(0.0);
        for other in &gathered {
            for (acc, x) in buf.iter_mut().zip(other) {
                *acc += x;
            }
        }

        Ok(())
    }

    fn broadcast(&self, buf: &mut [f32], root: usize) -> Result<()> {
        self.check_root("broadcast", root)?;
        let gathered = self.exchange(&self.shared.floats, buf.to_vec())?;

        let source = &gathered[root];
        if source.len() != buf.len() {
            return Err(DistributedError::ShapeMismatch {
                op: "broadcast",
                got: source.len(),
                expected: buf.len(),
            });
        }

        buf.copy_from_slice(source);
        Ok(())
    }

    fn all_gather(&self, buf: &[f32]) -> Result<Vec<Vec<f32>>> {
        self.exchange(&self.shared.floats, buf.to_vec())
    }

    fn all_gather_bytes(&self, bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.exchange(&self.shared.bytes, bytes.to_vec())
    }

    fn broadcast_bytes(&self, bytes: Vec<u8>, root: usize) -> Result<Vec<u8>> {
        self.check_root("broadcast_bytes", root)?;
        let mut gathered = self.exchange(&self.shared.bytes, bytes)?;
        Ok(gathered.swap_remove(root))
    }

    fn destroy(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(rank = self.rank; "destroyed thread group member");
        }
        Ok(())
    }
}
