use clap::Parser;
use worker::cli::{self, InferArgs};

fn main() -> anyhow::Result<()> {
    cli::init_logging();
    cli::run(InferArgs::parse().into_config())
}
