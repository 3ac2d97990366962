use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    if let Err(err) = parsed.dispatch().await {
        // Job-runner error annotation; the job fails on non-zero exit
        println!("::error::{:#}", err);
        std::process::exit(1);
    }
}
