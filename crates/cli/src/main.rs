use anyhow::Context;
use clap::Parser;
use godbg_cli::{cli::Cli, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "godbg", error = %format!("{err:#}"), "command failed");
		eprintln!("Error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let subcommand = format!("{:?}", cli.command).to_lowercase();
	commands::dispatch(cli).await.with_context(|| format!("godbg {subcommand} failed"))
}
