use cachetop::cli::{self, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Flush(args) => cli::flush::run(args).await,
        Command::Count => cli::count::run().await,
        Command::Exists(args) => cli::exists::run(args).await,
    }
}
