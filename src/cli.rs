//! Shared entry point of the per-layout executables

use crate::config::{BenchConfig, Mode};
use crate::error::{config_error, BenchResult};
use crate::layout::LayoutKind;
use crate::runner::run;
use anyhow::Context;

/// Exactly one mode argument, program name already stripped
pub fn parse_mode<I>(args: I) -> BenchResult<Mode>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut args = args.into_iter();
    let mode = args
        .next()
        .ok_or_else(|| config_error("missing mode argument (force, update, apply_action or populate)"))?;

    if let Some(extra) = args.next() {
        return Err(config_error(format!(
            "expected exactly one mode argument, got extra '{}'",
            extra.as_ref()
        )));
    }

    mode.as_ref().parse()
}

/// env_logger at `info` unless `RUST_LOG` says otherwise
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

/// `main` of the `aos`, `soa` and `aosoa` binaries
pub fn run_layout_binary(layout: LayoutKind) -> anyhow::Result<()> {
    init_logging();

    let mode = parse_mode(std::env::args().skip(1))
        .with_context(|| format!("usage: {} <force|update|apply_action|populate>", layout))?;

    let config = BenchConfig::default();
    let report = run(layout, mode, &config).with_context(|| format!("{} {} failed", layout, mode))?;

    log::info!(
        "[{}] {} particles, {} bytes",
        layout,
        report.particles,
        report.footprint_bytes
    );
    Ok(())
}
