//! ledcycle — cycle a tri-color LED with one button, stop with another.

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "ledcycle",
    version,
    about = "Cycle a tri-color LED with one button, exit with another"
)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = cli::run(args.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
