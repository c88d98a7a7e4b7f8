mod advisory;
mod classify;
mod cli;
mod commands;
mod config;
mod context;
mod error;
mod issue;
mod logging;
mod models;
mod report;
mod text;
mod tracker;

use clap::Parser;

use cli::Cli;
use config::Config;
use context::RunContext;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = Config::load(&cli.config);
    let ctx = RunContext::from_env();

    if let Err(e) = commands::dispatch(&cli, &config, &ctx).await {
        std::process::exit(error::report(&e));
    }
}
