// CLI entry for the shared-memory pipeline
use anyhow::Result;
use clap::{Parser, ValueHint};
use halopipe::cli::{
    DEFAULT_INPUT, DEFAULT_SHARED_OUTPUT, available_parallelism, filter_spec, init_logging,
    load_input, parse_or_exit, save_output,
};
use halopipe::io::BmpHeader;
use halopipe::pipeline::{RunConfig, run_shared};
use parking_lot::Mutex;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "halopipe-shared",
    version,
    about = "Median filter, grayscale and equalize a BMP on a shared-memory thread pool"
)]
struct Cli {
    /// Median window size (even sizes are rounded up to odd)
    filter_size: u32,

    /// Number of threads
    threads: usize,

    /// Input image path
    #[arg(short = 'i', long = "input", default_value = DEFAULT_INPUT, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output image path
    #[arg(short = 'o', long = "output", default_value = DEFAULT_SHARED_OUTPUT, value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli: Cli = parse_or_exit();

    let filter = filter_spec(cli.filter_size)?;
    let config = RunConfig::new(filter).with_threads(cli.threads);
    config.validate()?;

    println!(
        "Threads: {} (available: {}). Filter: {}x{}",
        config.threads_per_worker,
        available_parallelism(),
        filter.size(),
        filter.size()
    );

    let header = Mutex::new(BmpHeader::default());
    let input = load_input(&cli.input, &header)?;
    let (grid, report) = run_shared(&config, &input)?;

    println!("Total time: {:.6} s", report.elapsed.as_secs_f64());
    log::info!("{}", report);

    save_output(&cli.output, grid, header.into_inner())?;
    println!("Image saved to {}", cli.output.display());
    Ok(())
}
