pub mod dispatch;
pub mod registry;
mod serve;

use godbg::DebuggerConfig;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = effective_config(&cli)?;
	match cli.command {
		Commands::Serve => serve::run_serve(config).await?,
		Commands::Commands => emit("commands", registry::COMMANDS, cli.format),
		Commands::Config => emit("config", config, cli.format),
	}

	Ok(())
}

/// Config file first, then flags and environment on top.
pub fn effective_config(cli: &Cli) -> Result<DebuggerConfig> {
	let mut config = match &cli.config {
		Some(path) => DebuggerConfig::from_file(path).map_err(|e| CliError::Config {
			path: path.clone(),
			message: e.to_string(),
		})?,
		None => DebuggerConfig::default(),
	};
	if let Some(dlv) = &cli.dlv {
		config.dlv_path = Some(dlv.clone());
	}
	if let Some(go) = &cli.go {
		config.go_path = Some(go.clone());
	}
	Ok(config)
}

fn emit<T: serde::Serialize>(command: &'static str, data: T, format: OutputFormat) {
	let result = ResultBuilder::new(command).data(data).no_schema_version().build();
	print_result(&result, format);
}
