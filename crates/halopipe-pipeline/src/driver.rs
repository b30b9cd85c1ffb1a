//! Pipeline driver
//!
//! [`run_worker`] is the per-member program. It is written once against
//! [`Collective`] and runs unchanged in both execution models:
//!
//! - [`run_distributed`]: one OS thread per member of a
//!   [`ChannelGroup`], each with private buffers
//! - [`run_shared`]: a single [`SingleProcess`] member whose row
//!   kernels run on a fixed-size rayon pool
//!
//! Stages, in order: barrier, broadcast dims, scatter, median filter,
//! grayscale, local histogram, all-reduce, derive map, remap, gather,
//! barrier. Only the coordinator holds the full grid.

use crate::{PipelineError, PipelineResult, RunConfig, RunReport, StageTimings};
use halopipe_color::{EqualizationMap, grayscale_rows, local_histogram, remap_rows};
use halopipe_comm::{
    ChannelGroup, Collective, DistributionPlan, GridDims, Role, SingleProcess, partition_for,
    partition_rows,
};
use halopipe_core::{FilterSpec, Grid, alloc_bytes, rows_to_bytes};
use halopipe_filter::{RowBand, median_filter_band};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::thread;
use std::time::{Duration, Instant};

/// Where a member's row kernels run.
pub struct Executor {
    pool: Option<ThreadPool>,
    threads: usize,
}

impl Executor {
    /// A dedicated pool of `threads` threads, or the calling thread
    /// when `threads <= 1`.
    pub fn new(threads: usize) -> PipelineResult<Self> {
        if threads <= 1 {
            return Ok(Self {
                pool: None,
                threads: 1,
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("halopipe-kernel-{}", i))
            .build()?;
        Ok(Self {
            pool: Some(pool),
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `op` with the thread count it should split its rows into.
    fn run<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce(usize) -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| op(self.threads)),
            None => op(1),
        }
    }
}

/// What one member returns from [`run_worker`].
#[derive(Debug)]
pub struct WorkerOutcome {
    /// The assembled grid; only the coordinator has one
    pub output: Option<Grid>,
    pub elapsed: Duration,
    pub stages: StageTimings,
}

/// Run the pipeline as one member of a group.
///
/// The coordinator passes the input grid; workers pass `None`. The
/// distribution plan is built before the opening barrier and is not
/// part of the timed region.
pub fn run_worker<C: Collective>(
    comm: &mut C,
    filter: FilterSpec,
    input: Option<&Grid>,
    exec: &Executor,
) -> PipelineResult<WorkerOutcome> {
    let rank = comm.rank();
    let workers = comm.size();
    let radius = filter.radius();

    let prepared = match (comm.role(), input) {
        (Role::Coordinator, Some(grid)) => {
            let parts = partition_rows(grid.height(), workers, radius)?;
            let plan = DistributionPlan::build(&parts, grid.width());
            plan.validate(grid.data().len())?;
            Some((grid, plan))
        }
        (Role::Coordinator, None) => {
            return Err(PipelineError::InputUnavailable(
                "coordinator started without an input grid".into(),
            ));
        }
        (Role::Worker, _) => None,
    };
    let plan = prepared.as_ref().map(|(_, plan)| plan);

    comm.barrier()?;
    let start = Instant::now();
    let mut stages = StageTimings::default();

    // Distribute
    let t = Instant::now();
    let dims = comm.broadcast_dims(prepared.as_ref().map(|(grid, _)| GridDims {
        width: grid.width(),
        height: grid.height(),
    }))?;
    let part = partition_for(dims.height, workers, radius, rank)?;
    log::debug!("rank {} of {}: {:?}", rank, workers, part);

    let width = dims.width;
    let mut input_rows = alloc_bytes(rows_to_bytes(part.input_row_count, width))?;
    comm.scatter(
        prepared.as_ref().map(|(grid, plan)| (grid.data(), plan)),
        &mut input_rows,
    )?;
    stages.communication += t.elapsed();

    // Median filter
    let t = Instant::now();
    let mut owned = alloc_bytes(rows_to_bytes(part.output_row_count, width))?;
    let band = RowBand::new(&input_rows, width, dims.height, part.input_row_start)?;
    exec.run(|threads| {
        median_filter_band(&band, filter, part.output_row_start, &mut owned, threads)
    })?;
    drop(input_rows);
    stages.filter = t.elapsed();
    if comm.is_coordinator() {
        log::info!("1. median filter {}x{} applied", filter.size(), filter.size());
    }

    // Grayscale
    let t = Instant::now();
    exec.run(|threads| grayscale_rows(&mut owned, width, threads))?;
    stages.grayscale = t.elapsed();
    if comm.is_coordinator() {
        log::info!("2. grayscale conversion applied");
    }

    // Equalize: local histogram, global sum, local derive and remap
    let t = Instant::now();
    let local = exec.run(|threads| local_histogram(&owned, width, threads))?;
    let mut equalize_time = t.elapsed();

    let t = Instant::now();
    let global = comm.all_reduce_sum(&local)?;
    stages.communication += t.elapsed();

    let t = Instant::now();
    let total = dims.width as u64 * dims.height as u64;
    let map = EqualizationMap::derive(&global, total)?;
    exec.run(|threads| remap_rows(&mut owned, width, &map, threads))?;
    equalize_time += t.elapsed();
    stages.equalize = equalize_time;
    if comm.is_coordinator() {
        log::info!("3. histogram equalization applied");
    }

    // Reassemble
    let t = Instant::now();
    let mut output = match plan {
        Some(_) => Some(Grid::new(dims.width, dims.height)?),
        None => None,
    };
    let dest = match (output.as_mut(), plan) {
        (Some(grid), Some(plan)) => Some((grid.data_mut(), plan)),
        _ => None,
    };
    comm.gather(&owned, dest)?;
    stages.communication += t.elapsed();

    comm.barrier()?;
    let elapsed = start.elapsed();
    if comm.is_coordinator() {
        log::info!("4. result gathered in {:.6} s", elapsed.as_secs_f64());
    }

    Ok(WorkerOutcome {
        output,
        elapsed,
        stages,
    })
}

fn make_report(config: &RunConfig, workers: usize, grid: &Grid, outcome: &WorkerOutcome) -> RunReport {
    RunReport {
        workers,
        threads_per_worker: config.threads_per_worker,
        filter_size: config.filter.size(),
        width: grid.width(),
        height: grid.height(),
        elapsed: outcome.elapsed,
        stages: outcome.stages,
    }
}

fn warn_if_coerced(filter: FilterSpec) {
    if filter.was_coerced() {
        log::warn!(
            "filter size {} is even, using {}",
            filter.requested(),
            filter.size()
        );
    }
}

/// Run the pipeline on a group of `config.workers` members with
/// private memory.
///
/// `load` runs on the coordinator's thread after the group is up. If it
/// fails, the coordinator aborts the group so no worker is left
/// waiting, and the load error is returned.
pub fn run_distributed<F>(config: &RunConfig, load: F) -> PipelineResult<(Grid, RunReport)>
where
    F: FnOnce() -> PipelineResult<Grid> + Send,
{
    config.validate()?;
    warn_if_coerced(config.filter);

    let endpoints = ChannelGroup::new(config.workers)?.into_endpoints();
    let mut load = Some(load);

    let results: Vec<PipelineResult<(Option<Grid>, WorkerOutcome)>> = thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|mut endpoint| {
                let load = if endpoint.is_coordinator() {
                    load.take()
                } else {
                    None
                };
                s.spawn(move || {
                    let result = member_main(&mut endpoint, config, load);
                    if let Err(e) = &result
                        && !e.is_abort()
                    {
                        endpoint.abort(&e.to_string());
                    }
                    result
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(PipelineError::WorkerPanicked { rank }))
            })
            .collect()
    });

    let mut first_abort = None;
    let mut root_cause = None;
    let mut coordinator = None;
    for result in results {
        match result {
            Ok((Some(input), outcome)) => coordinator = Some((input, outcome)),
            Ok((None, _)) => {}
            Err(e) if e.is_abort() => {
                first_abort.get_or_insert(e);
            }
            Err(e) => {
                root_cause.get_or_insert(e);
            }
        }
    }
    if let Some(e) = root_cause.or(first_abort) {
        return Err(e);
    }

    let (input, mut outcome) = coordinator.ok_or(PipelineError::MissingOutput)?;
    let report = make_report(config, config.workers, &input, &outcome);
    let output = outcome.output.take().ok_or(PipelineError::MissingOutput)?;
    log::info!(
        "distributed run: {} workers, {:.6} s",
        config.workers,
        report.elapsed.as_secs_f64()
    );
    Ok((output, report))
}

/// Body of one member thread. The coordinator also returns its input
/// so the caller can report its dimensions.
fn member_main<C, F>(
    comm: &mut C,
    config: &RunConfig,
    load: Option<F>,
) -> PipelineResult<(Option<Grid>, WorkerOutcome)>
where
    C: Collective,
    F: FnOnce() -> PipelineResult<Grid>,
{
    let exec = Executor::new(config.threads_per_worker)?;
    let input = match load {
        Some(load) => Some(load()?),
        None => None,
    };
    let outcome = run_worker(comm, config.filter, input.as_ref(), &exec)?;
    Ok((input, outcome))
}

/// Run the pipeline as a single member with `config.threads_per_worker`
/// kernel threads. `config.workers` is ignored.
pub fn run_shared(config: &RunConfig, input: &Grid) -> PipelineResult<(Grid, RunReport)> {
    config.validate()?;
    warn_if_coerced(config.filter);

    let exec = Executor::new(config.threads_per_worker)?;
    let mut comm = SingleProcess::new();
    let mut outcome = match run_worker(&mut comm, config.filter, Some(input), &exec) {
        Ok(outcome) => outcome,
        Err(e) => {
            comm.abort(&e.to_string());
            return Err(e);
        }
    };

    let report = make_report(config, 1, input, &outcome);
    let output = outcome.output.take().ok_or(PipelineError::MissingOutput)?;
    log::info!(
        "shared run: {} threads, {:.6} s",
        exec.threads(),
        report.elapsed.as_secs_f64()
    );
    Ok((output, report))
}

/// Whole-grid pipeline on the calling thread, without any group.
pub fn process_grid(input: &Grid, filter: FilterSpec) -> PipelineResult<Grid> {
    let mut grid = halopipe_filter::median_filter(input, filter)?;
    halopipe_color::grayscale(&mut grid)?;
    halopipe_color::equalize(&mut grid)?;
    Ok(grid)
}
