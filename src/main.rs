use clap::Parser;
use pmp_auth_core::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Worker => cli::worker::run().await,
        Command::All => cli::all::run().await,
    }
}
