use crate::demo::{run_batch, run_demo, BatchArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use readiness::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Readiness Scoring Engine",
    about = "Score assessment sessions and serve the readiness API from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a seeded session and print its breakdown, next questions and benchmark
    Demo(DemoArgs),
    /// Recompute every seeded session and export the results as CSV
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Batch(args) => run_batch(args).await,
    }
}
