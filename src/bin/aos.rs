/// Array-of-structures layout benchmark
/// Usage: aos <force|update|apply_action|populate>

use layout_bench::cli::run_layout_binary;
use layout_bench::LayoutKind;

fn main() -> anyhow::Result<()> {
    run_layout_binary(LayoutKind::Aos)
}
