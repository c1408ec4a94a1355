use anyhow::Result;
use clap::Parser;

use segvolution::args::Args;
use segvolution::runner::Runner;

fn main() -> Result<()> {
    let args = Args::parse();
    let mut runner = Runner::new(args)?;
    runner.start()
}
