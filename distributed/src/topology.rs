use std::{env, fs};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::Result, transport::Transport};

/// Environment variable naming this worker's host.
pub const HOSTNAME_ENV: &str = "HOSTNAME";

const HOSTNAME_FILE: &str = "/proc/sys/kernel/hostname";
const FALLBACK_HOST: &str = "localhost";

/// A worker's global rank and the host it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub rank: usize,
    pub host: String,
}

/// Returns the identifier of the host this process runs on.
///
/// Reads `HOSTNAME`, then the kernel's hostname, falling back to `"localhost"`.
pub fn host_id() -> String {
    env::var(HOSTNAME_ENV)
        .ok()
        .or_else(|| fs::read_to_string(HOSTNAME_FILE).ok())
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

/// Computes a worker's position among the workers sharing its host.
///
/// # Arguments
/// * `rank` - The worker's global rank.
/// * `host` - The worker's host.
/// * `peers` - Every worker in the group, including this one.
///
/// # Returns
/// `(local_rank, local_size)`: how many workers on `host` have a lower rank,
/// and how many run on `host` at all.
pub fn local_rank_and_size_of(rank: usize, host: &str, peers: &[Peer]) -> (usize, usize) {
    peers
        .iter()
        .filter(|peer| peer.host == host)
        .fold((0, 0), |(local_rank, local_size), peer| {
            (local_rank + usize::from(peer.rank < rank), local_size + 1)
        })
}

/// Discovers this worker's local rank and size by all-gathering every
/// worker's `(rank, host)`.
///
/// Collective: every member of `transport` must call it.
pub fn local_rank_and_size(transport: &dyn Transport, host: &str) -> Result<(usize, usize)> {
    let rank = transport.rank();
    let me = Peer {
        rank,
        host: host.to_string(),
    };

    let peers = transport
        .all_gather_bytes(&serde_json::to_vec(&me)?)?
        .iter()
        .map(|bytes| serde_json::from_slice(bytes))
        .collect::<std::result::Result<Vec<Peer>, _>>()?;

    let (local_rank, local_size) = local_rank_and_size_of(rank, host, &peers);
    debug!(
        rank = rank,
        host = host,
        local_rank = local_rank,
        local_size = local_size;
        "discovered local topology"
    );

    Ok((local_rank, local_size))
}
