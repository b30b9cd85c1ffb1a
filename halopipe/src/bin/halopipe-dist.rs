// CLI entry for the distributed-memory pipeline
use anyhow::Result;
use clap::{Parser, ValueHint};
use halopipe::cli::{
    DEFAULT_DIST_OUTPUT, DEFAULT_INPUT, available_parallelism, filter_spec, init_logging,
    load_input, parse_or_exit, save_output,
};
use halopipe::io::BmpHeader;
use halopipe::pipeline::{RunConfig, run_distributed};
use parking_lot::Mutex;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "halopipe-dist",
    version,
    about = "Median filter, grayscale and equalize a BMP across workers with private memory"
)]
struct Cli {
    /// Median window size (even sizes are rounded up to odd)
    filter_size: u32,

    /// Number of workers [default: available parallelism]
    #[arg(short = 'p', long = "workers")]
    workers: Option<usize>,

    /// Kernel threads inside each worker
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,

    /// Input image path
    #[arg(short = 'i', long = "input", default_value = DEFAULT_INPUT, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output image path
    #[arg(short = 'o', long = "output", default_value = DEFAULT_DIST_OUTPUT, value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli: Cli = parse_or_exit();

    let filter = filter_spec(cli.filter_size)?;
    let config = RunConfig::new(filter)
        .with_workers(cli.workers.unwrap_or_else(available_parallelism))
        .with_threads(cli.threads);
    config.validate()?;

    println!(
        "Started with {} workers x {} threads. Filter: {}x{}",
        config.workers,
        config.threads_per_worker,
        filter.size(),
        filter.size()
    );

    let header = Mutex::new(BmpHeader::default());
    let (grid, report) = run_distributed(&config, || load_input(&cli.input, &header))?;

    println!("Total time: {:.6} s", report.elapsed.as_secs_f64());
    log::info!("{}", report);

    save_output(&cli.output, grid, header.into_inner())?;
    println!("Image saved to {}", cli.output.display());
    Ok(())
}
