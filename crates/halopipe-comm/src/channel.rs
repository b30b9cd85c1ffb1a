//! Message-passing group for the distributed-memory execution model
//!
//! A [`ChannelGroup`] wires a fixed number of endpoints together with
//! one `mpsc` inbox per member. Each endpoint is moved onto its own
//! thread and owns its buffers; the only way data crosses between
//! members is a message sent by one of the collectives below.
//!
//! Collectives are rooted at the coordinator. Receives are matched on
//! (source, tag); messages that arrive early for a later collective
//! are stashed until asked for, so members may run ahead of each other
//! without confusing the coordinator.

use crate::collective::{Collective, GridDims, Role};
use crate::plan::DistributionPlan;
use crate::{CommError, CommResult};
use halopipe_core::Histogram;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Rank of the coordinator in every channel group.
pub const COORDINATOR_RANK: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    BarrierArrive,
    BarrierRelease,
    Dims,
    Scatter,
    ReduceContribution,
    ReduceResult,
    Gather,
    Abort,
}

#[derive(Debug)]
enum Message {
    BarrierArrive,
    BarrierRelease,
    Dims(GridDims),
    Scatter(Vec<u8>),
    ReduceContribution(Box<Histogram>),
    ReduceResult(Box<Histogram>),
    Gather(Vec<u8>),
    Abort(String),
}

impl Message {
    fn tag(&self) -> Tag {
        match self {
            Message::BarrierArrive => Tag::BarrierArrive,
            Message::BarrierRelease => Tag::BarrierRelease,
            Message::Dims(_) => Tag::Dims,
            Message::Scatter(_) => Tag::Scatter,
            Message::ReduceContribution(_) => Tag::ReduceContribution,
            Message::ReduceResult(_) => Tag::ReduceResult,
            Message::Gather(_) => Tag::Gather,
            Message::Abort(_) => Tag::Abort,
        }
    }
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    message: Message,
}

/// Builder for a fixed-size group of connected endpoints.
pub struct ChannelGroup {
    endpoints: Vec<ChannelEndpoint>,
}

impl ChannelGroup {
    /// Create a group of `size` members. Rank 0 is the coordinator.
    pub fn new(size: usize) -> CommResult<Self> {
        if size == 0 {
            return Err(CommError::InvalidGroup("group size must be > 0".into()));
        }

        let (senders, inboxes): (Vec<Sender<Envelope>>, Vec<Receiver<Envelope>>) =
            (0..size).map(|_| channel()).unzip();

        let endpoints = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ChannelEndpoint {
                rank,
                size,
                role: if rank == COORDINATOR_RANK {
                    Role::Coordinator
                } else {
                    Role::Worker
                },
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                    .collect(),
                inbox,
                stash: VecDeque::new(),
                aborted: None,
            })
            .collect();

        log::debug!("created channel group of {} members", size);
        Ok(Self { endpoints })
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.endpoints.len()
    }

    /// Hand out the endpoints, ordered by rank.
    pub fn into_endpoints(self) -> Vec<ChannelEndpoint> {
        self.endpoints
    }
}

/// One member of a [`ChannelGroup`].
pub struct ChannelEndpoint {
    rank: usize,
    size: usize,
    role: Role,
    /// Sender to every other member; `None` at our own rank
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    stash: VecDeque<Envelope>,
    aborted: Option<(usize, String)>,
}

impl ChannelEndpoint {
    fn check_live(&self) -> CommResult<()> {
        match &self.aborted {
            Some((by, reason)) => Err(CommError::Aborted {
                by: *by,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn send(&mut self, dest: usize, message: Message) -> CommResult<()> {
        let tx = self.peers[dest]
            .as_ref()
            .ok_or_else(|| CommError::InvalidGroup(format!("rank {} sending to itself", dest)))?;
        let sent = tx.send(Envelope {
            source: self.rank,
            message,
        });
        match sent {
            Ok(()) => Ok(()),
            Err(_) => Err(self.disconnected(dest)),
        }
    }

    /// Error for a peer that hung up.
    ///
    /// A peer that aborts and then exits leaves its abort notice in our
    /// inbox; report that instead of the closed channel.
    fn disconnected(&mut self, peer: usize) -> CommError {
        while let Ok(envelope) = self.inbox.try_recv() {
            if let Message::Abort(reason) = envelope.message {
                if self.aborted.is_none() {
                    self.aborted = Some((envelope.source, reason.clone()));
                }
                return CommError::Aborted {
                    by: envelope.source,
                    reason,
                };
            }
            self.stash.push_back(envelope);
        }
        CommError::Disconnected { peer }
    }

    fn recv(&mut self, source: usize, tag: Tag) -> CommResult<Message> {
        if let Some(pos) = self
            .stash
            .iter()
            .position(|e| e.source == source && e.message.tag() == tag)
            && let Some(envelope) = self.stash.remove(pos)
        {
            return Ok(envelope.message);
        }

        loop {
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { peer: source })?;
            if let Message::Abort(reason) = envelope.message {
                log::debug!("rank {} saw abort from rank {}", self.rank, envelope.source);
                self.aborted = Some((envelope.source, reason.clone()));
                return Err(CommError::Aborted {
                    by: envelope.source,
                    reason,
                });
            }
            if envelope.source == source && envelope.message.tag() == tag {
                return Ok(envelope.message);
            }
            self.stash.push_back(envelope);
        }
    }

    fn others(&self) -> impl Iterator<Item = usize> + use<> {
        let me = self.rank;
        (0..self.size).filter(move |&r| r != me)
    }

    fn coordinator_input<T>(&self, value: Option<T>, what: &'static str) -> CommResult<Option<T>> {
        match (self.role, value.is_some()) {
            (Role::Coordinator, false) => Err(CommError::RoleMismatch {
                rank: self.rank,
                message: what,
            }),
            (Role::Worker, true) => Err(CommError::RoleMismatch {
                rank: self.rank,
                message: "only the coordinator supplies root buffers",
            }),
            _ => Ok(value),
        }
    }

    fn check_plan(&self, plan: &DistributionPlan, total_len: usize) -> CommResult<()> {
        if plan.workers() != self.size {
            return Err(CommError::InvalidPlan(format!(
                "plan built for {} workers, group has {}",
                plan.workers(),
                self.size
            )));
        }
        plan.validate(total_len)
    }
}

impl Collective for ChannelEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn role(&self) -> Role {
        self.role
    }

    fn barrier(&mut self) -> CommResult<()> {
        self.check_live()?;
        match self.role {
            Role::Coordinator => {
                for peer in self.others() {
                    self.recv(peer, Tag::BarrierArrive)?;
                }
                for peer in self.others() {
                    self.send(peer, Message::BarrierRelease)?;
                }
            }
            Role::Worker => {
                self.send(COORDINATOR_RANK, Message::BarrierArrive)?;
                self.recv(COORDINATOR_RANK, Tag::BarrierRelease)?;
            }
        }
        Ok(())
    }

    fn broadcast_dims(&mut self, dims: Option<GridDims>) -> CommResult<GridDims> {
        self.check_live()?;
        let dims = self.coordinator_input(dims, "coordinator must supply grid dimensions")?;
        match dims {
            Some(dims) => {
                for peer in self.others() {
                    self.send(peer, Message::Dims(dims))?;
                }
                Ok(dims)
            }
            None => match self.recv(COORDINATOR_RANK, Tag::Dims)? {
                Message::Dims(dims) => Ok(dims),
                _ => unreachable!("recv matched on tag"),
            },
        }
    }

    fn scatter(
        &mut self,
        source: Option<(&[u8], &DistributionPlan)>,
        recv: &mut [u8],
    ) -> CommResult<()> {
        self.check_live()?;
        let source = self.coordinator_input(source, "coordinator must supply scatter source")?;
        match source {
            Some((full, plan)) => {
                self.check_plan(plan, full.len())?;
                for peer in self.others() {
                    self.send(peer, Message::Scatter(full[plan.scatter_range(peer)].to_vec()))?;
                }
                let own = plan.scatter_range(self.rank);
                if own.len() != recv.len() {
                    return Err(CommError::LengthMismatch {
                        rank: self.rank,
                        expected: own.len(),
                        actual: recv.len(),
                    });
                }
                recv.copy_from_slice(&full[own]);
            }
            None => {
                let Message::Scatter(chunk) = self.recv(COORDINATOR_RANK, Tag::Scatter)? else {
                    unreachable!("recv matched on tag")
                };
                if chunk.len() != recv.len() {
                    return Err(CommError::LengthMismatch {
                        rank: self.rank,
                        expected: recv.len(),
                        actual: chunk.len(),
                    });
                }
                recv.copy_from_slice(&chunk);
            }
        }
        Ok(())
    }

    fn all_reduce_sum(&mut self, local: &Histogram) -> CommResult<Histogram> {
        self.check_live()?;
        match self.role {
            Role::Coordinator => {
                // Integer addition: rank order is fixed but irrelevant
                let mut global = Histogram::new();
                for rank in 0..self.size {
                    if rank == self.rank {
                        global.merge(local);
                        continue;
                    }
                    let Message::ReduceContribution(part) =
                        self.recv(rank, Tag::ReduceContribution)?
                    else {
                        unreachable!("recv matched on tag")
                    };
                    global.merge(&part);
                }
                for peer in self.others() {
                    self.send(peer, Message::ReduceResult(Box::new(global)))?;
                }
                Ok(global)
            }
            Role::Worker => {
                self.send(
                    COORDINATOR_RANK,
                    Message::ReduceContribution(Box::new(*local)),
                )?;
                let Message::ReduceResult(global) =
                    self.recv(COORDINATOR_RANK, Tag::ReduceResult)?
                else {
                    unreachable!("recv matched on tag")
                };
                Ok(*global)
            }
        }
    }

    fn gather(
        &mut self,
        send: &[u8],
        dest: Option<(&mut [u8], &DistributionPlan)>,
    ) -> CommResult<()> {
        self.check_live()?;
        let dest = self.coordinator_input(dest, "coordinator must supply gather destination")?;
        match dest {
            Some((full, plan)) => {
                self.check_plan(plan, full.len())?;
                let own = plan.gather_range(self.rank);
                if own.len() != send.len() {
                    return Err(CommError::LengthMismatch {
                        rank: self.rank,
                        expected: own.len(),
                        actual: send.len(),
                    });
                }
                full[own].copy_from_slice(send);

                for peer in self.others() {
                    let Message::Gather(chunk) = self.recv(peer, Tag::Gather)? else {
                        unreachable!("recv matched on tag")
                    };
                    let range = plan.gather_range(peer);
                    if chunk.len() != range.len() {
                        return Err(CommError::LengthMismatch {
                            rank: peer,
                            expected: range.len(),
                            actual: chunk.len(),
                        });
                    }
                    full[range].copy_from_slice(&chunk);
                }
            }
            None => {
                self.send(COORDINATOR_RANK, Message::Gather(send.to_vec()))?;
            }
        }
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        if self.aborted.is_some() {
            return;
        }
        log::error!("rank {} aborting group: {}", self.rank, reason);
        self.aborted = Some((self.rank, reason.to_string()));
        for peer in self.others() {
            // A peer that already left has nothing left to wait for
            let _ = self.send(peer, Message::Abort(reason.to_string()));
        }
    }
}

impl Drop for ChannelEndpoint {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.abort("worker thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_rows;

    /// Run `f` on every endpoint of a fresh group, one thread each.
    fn run_group<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ChannelEndpoint) -> T + Sync,
    {
        let endpoints = ChannelGroup::new(size).unwrap().into_endpoints();
        std::thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|ep| {
                    let f = &f;
                    scope.spawn(move || f(ep))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_roles() {
        let roles = run_group(3, |ep| ep.role());
        assert_eq!(roles, vec![Role::Coordinator, Role::Worker, Role::Worker]);
    }

    #[test]
    fn test_broadcast_and_barrier() {
        let dims = GridDims {
            width: 640,
            height: 480,
        };
        let got = run_group(4, |mut ep| {
            ep.barrier().unwrap();
            let input = ep.is_coordinator().then_some(dims);
            let d = ep.broadcast_dims(input).unwrap();
            ep.barrier().unwrap();
            d
        });
        assert!(got.iter().all(|d| *d == dims));
    }

    #[test]
    fn test_all_reduce_sum() {
        let results = run_group(5, |mut ep| {
            let mut h = Histogram::new();
            for _ in 0..=ep.rank() {
                h.add(ep.rank() as u8);
            }
            h.add(255);
            ep.all_reduce_sum(&h).unwrap()
        });
        for global in &results {
            assert_eq!(global, &results[0]);
            for rank in 0..5u8 {
                assert_eq!(global.get(rank), rank as u64 + 1);
            }
            assert_eq!(global.get(255), 5);
        }
    }

    #[test]
    fn test_scatter_then_gather_roundtrip() {
        let width = 2u32;
        let height = 7u32;
        let full: Vec<u8> = (0..(width * height * 3)).map(|v| v as u8).collect();

        let results = run_group(3, |mut ep| {
            let parts = partition_rows(height, ep.size(), 1).unwrap();
            let mine = parts[ep.rank()];
            let plan = ep
                .is_coordinator()
                .then(|| DistributionPlan::build(&parts, width));

            let mut local = vec![0u8; (mine.input_row_count * width * 3) as usize];
            ep.scatter(
                plan.as_ref().map(|p| (full.as_slice(), p)),
                &mut local,
            )
            .unwrap();

            // Send back only the owned rows
            let skip = (mine.halo_above() * width * 3) as usize;
            let owned = &local[skip..skip + (mine.output_row_count * width * 3) as usize];
            let mut out = ep.is_coordinator().then(|| vec![0u8; full.len()]);
            ep.gather(
                owned,
                out.as_mut().zip(plan.as_ref()).map(|(o, p)| (o.as_mut_slice(), p)),
            )
            .unwrap();
            out
        });

        assert_eq!(results[0].as_deref(), Some(full.as_slice()));
        assert!(results[1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_abort_releases_blocked_workers() {
        let results = run_group(4, |mut ep| {
            if ep.is_coordinator() {
                ep.abort("input missing");
                return Ok(GridDims {
                    width: 0,
                    height: 0,
                });
            }
            ep.broadcast_dims(None)
        });
        for r in &results[1..] {
            assert!(matches!(r, Err(CommError::Aborted { by: 0, .. })));
        }
    }

    #[test]
    fn test_worker_supplying_root_buffer_is_rejected() {
        let results = run_group(2, |mut ep| {
            if ep.is_coordinator() {
                // Wait for the worker's verdict, then stop
                ep.barrier()
            } else {
                let err = ep
                    .broadcast_dims(Some(GridDims {
                        width: 1,
                        height: 1,
                    }))
                    .unwrap_err();
                assert!(matches!(err, CommError::RoleMismatch { rank: 1, .. }));
                ep.barrier()
            }
        });
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_zero_size_group_rejected() {
        assert!(ChannelGroup::new(0).is_err());
    }
}
