/// Layout benchmark suite
/// Runs every configured layout for every configured mode and prints the timings

use anyhow::Context;
use layout_bench::cli::init_logging;
use layout_bench::runner::CSV_HEADER;
use layout_bench::{run_suite, BenchConfig};

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => BenchConfig::load(&path).with_context(|| format!("failed to load config {}", path))?,
        None => BenchConfig::default(),
    };

    let reports = run_suite(&config).context("benchmark suite failed")?;

    let mut current_mode = None;
    for report in &reports {
        if current_mode != Some(report.mode) {
            println!();
            current_mode = Some(report.mode);
        }
        println!("{}", report.summary_line());
    }

    println!();
    println!("{}", CSV_HEADER);
    for report in &reports {
        println!("{}", report.csv_row());
    }

    Ok(())
}
