use clap::Parser;
use stockfit::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
