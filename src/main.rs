mod cli;
mod client;
mod config;
mod error;
mod logging;
mod migration;
mod model;
mod util;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse_args(&args)?;

    logging::init(invocation.verbose);

    cli::execute(invocation.command).await
}
