//! WFR CLI - Command line tool for wildfire risk assessment.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wfr-cli",
    version,
    about = "Wildfire risk scoring from temperature, vegetation and rainfall"
)]
struct Cli {
    #[command(subcommand)]
    command: wfr_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    wfr_cmd::run(cli.command).await
}
