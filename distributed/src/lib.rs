pub mod ddp;
pub mod error;
pub mod group;
pub mod local;
pub mod strategy;
pub mod topology;
pub mod transport;

pub use ddp::{DdpModel, DdpStrategy};
pub use error::{DistributedError, Result};
pub use group::{default_group, destroy_process_group, init_process_group, is_initialized};
pub use local::LocalStrategy;
pub use strategy::{DistributedStrategy, GatherFn, Model, Optimizer};
pub use topology::{Peer, host_id, local_rank_and_size};
pub use transport::{ThreadGroup, Transport};
