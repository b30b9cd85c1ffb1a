//! halopipe-comm - Partitioning and collective communication
//!
//! This crate provides everything needed to move grid rows between
//! cooperating workers:
//!
//! - Row-balanced partitioning with halo extension ([`partition_rows`])
//! - Byte-level scatter/gather descriptors ([`DistributionPlan`])
//! - The [`Collective`] interface with a message-passing implementation
//!   ([`ChannelGroup`]) and a single-member one ([`SingleProcess`])

pub mod channel;
pub mod collective;
mod error;
pub mod local;
pub mod partition;
pub mod plan;

pub use channel::{COORDINATOR_RANK, ChannelEndpoint, ChannelGroup};
pub use collective::{Collective, GridDims, Role};
pub use error::{CommError, CommResult};
pub use local::SingleProcess;
pub use partition::{Partition, partition_for, partition_rows};
pub use plan::DistributionPlan;
