//! Collective communication interface
//!
//! The pipeline is written once against [`Collective`]. Two
//! implementations exist:
//!
//! - [`ChannelEndpoint`](crate::ChannelEndpoint): one member of a fixed
//!   group of workers with private memory, exchanging messages only
//! - [`SingleProcess`](crate::SingleProcess): a group of one, where every
//!   collective is a local copy
//!
//! All operations block until the caller's part of the collective is
//! complete. Every member of the group must call the same sequence of
//! collectives.

use crate::CommResult;
use crate::plan::DistributionPlan;
use halopipe_core::Histogram;

/// Whether a group member owns the full grid.
///
/// The coordinator loads the input, builds the distribution plan and
/// receives the gathered result. Workers only ever hold their own
/// slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Coordinator,
    Worker,
}

/// Grid dimensions broadcast from the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub width: u32,
    pub height: u32,
}

/// The five collective operations available to a group member.
pub trait Collective {
    /// Position of this member in the group, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of members in the group.
    fn size(&self) -> usize;

    /// Role of this member.
    fn role(&self) -> Role;

    /// Shorthand for `role() == Role::Coordinator`.
    fn is_coordinator(&self) -> bool {
        self.role() == Role::Coordinator
    }

    /// Block until every member has reached this barrier.
    fn barrier(&mut self) -> CommResult<()>;

    /// Distribute the grid dimensions.
    ///
    /// The coordinator passes `Some(dims)`; workers pass `None`. Every
    /// member returns the coordinator's value.
    fn broadcast_dims(&mut self, dims: Option<GridDims>) -> CommResult<GridDims>;

    /// Irregular scatter of halo-extended row blocks.
    ///
    /// The coordinator passes the full buffer and the plan; workers
    /// pass `None`. Every member passes a receive buffer sized to its
    /// own scatter count.
    fn scatter(
        &mut self,
        source: Option<(&[u8], &DistributionPlan)>,
        recv: &mut [u8],
    ) -> CommResult<()>;

    /// Element-wise sum of every member's histogram, returned to all.
    fn all_reduce_sum(&mut self, local: &Histogram) -> CommResult<Histogram>;

    /// Irregular gather of owned row blocks into the coordinator's buffer.
    ///
    /// Workers pass `None` as destination.
    fn gather(
        &mut self,
        send: &[u8],
        dest: Option<(&mut [u8], &DistributionPlan)>,
    ) -> CommResult<()>;

    /// Tell every other member to stop.
    ///
    /// Peers blocked in, or later entering, a collective return
    /// [`CommError::Aborted`](crate::CommError::Aborted).
    fn abort(&mut self, reason: &str);
}
