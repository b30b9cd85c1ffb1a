//! Single-member group for the shared-memory execution model

use crate::collective::{Collective, GridDims, Role};
use crate::plan::DistributionPlan;
use crate::{CommError, CommResult};
use halopipe_core::Histogram;

/// A group of one. The only member is the coordinator, its partition
/// spans the whole grid, and every collective is a local copy.
#[derive(Debug, Default)]
pub struct SingleProcess {
    aborted: Option<String>,
}

impl SingleProcess {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_live(&self) -> CommResult<()> {
        match &self.aborted {
            Some(reason) => Err(CommError::Aborted {
                by: 0,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn check_plan(plan: &DistributionPlan, total_len: usize) -> CommResult<()> {
    if plan.workers() != 1 {
        return Err(CommError::InvalidPlan(format!(
            "plan built for {} workers, group has 1",
            plan.workers()
        )));
    }
    plan.validate(total_len)
}

impl Collective for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn role(&self) -> Role {
        Role::Coordinator
    }

    fn barrier(&mut self) -> CommResult<()> {
        self.check_live()
    }

    fn broadcast_dims(&mut self, dims: Option<GridDims>) -> CommResult<GridDims> {
        self.check_live()?;
        dims.ok_or(CommError::RoleMismatch {
            rank: 0,
            message: "coordinator must supply grid dimensions",
        })
    }

    fn scatter(
        &mut self,
        source: Option<(&[u8], &DistributionPlan)>,
        recv: &mut [u8],
    ) -> CommResult<()> {
        self.check_live()?;
        let (full, plan) = source.ok_or(CommError::RoleMismatch {
            rank: 0,
            message: "coordinator must supply scatter source",
        })?;
        check_plan(plan, full.len())?;
        let range = plan.scatter_range(0);
        if range.len() != recv.len() {
            return Err(CommError::LengthMismatch {
                rank: 0,
                expected: range.len(),
                actual: recv.len(),
            });
        }
        recv.copy_from_slice(&full[range]);
        Ok(())
    }

    fn all_reduce_sum(&mut self, local: &Histogram) -> CommResult<Histogram> {
        self.check_live()?;
        Ok(*local)
    }

    fn gather(
        &mut self,
        send: &[u8],
        dest: Option<(&mut [u8], &DistributionPlan)>,
    ) -> CommResult<()> {
        self.check_live()?;
        let (full, plan) = dest.ok_or(CommError::RoleMismatch {
            rank: 0,
            message: "coordinator must supply gather destination",
        })?;
        check_plan(plan, full.len())?;
        let range = plan.gather_range(0);
        if range.len() != send.len() {
            return Err(CommError::LengthMismatch {
                rank: 0,
                expected: range.len(),
                actual: send.len(),
            });
        }
        full[range].copy_from_slice(send);
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        log::error!("aborting: {}", reason);
        self.aborted = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_rows;

    #[test]
    fn test_scatter_gather_identity() {
        let full: Vec<u8> = (0..4 * 3 * 3).map(|v| v as u8).collect();
        let plan = DistributionPlan::build(&partition_rows(4, 1, 2).unwrap(), 3);

        let mut comm = SingleProcess::new();
        let mut local = vec![0u8; full.len()];
        comm.scatter(Some((&full, &plan)), &mut local).unwrap();
        assert_eq!(local, full);

        let mut out = vec![0u8; full.len()];
        comm.gather(&local, Some((&mut out, &plan))).unwrap();
        assert_eq!(out, full);
    }

    #[test]
    fn test_reduce_is_identity() {
        let mut h = Histogram::new();
        h.add(7);
        let mut comm = SingleProcess::new();
        assert_eq!(comm.all_reduce_sum(&h).unwrap(), h);
    }

    #[test]
    fn test_abort_poisons_later_collectives() {
        let mut comm = SingleProcess::new();
        comm.abort("no input");
        assert!(matches!(comm.barrier(), Err(CommError::Aborted { by: 0, .. })));
    }

    #[test]
    fn test_missing_dims_is_role_mismatch() {
        let mut comm = SingleProcess::new();
        assert!(matches!(
            comm.broadcast_dims(None),
            Err(CommError::RoleMismatch { .. })
        ));
    }
}
