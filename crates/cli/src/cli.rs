use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "godbg")]
#[command(about = "Debug Go programs through Delve with structured, stateful responses")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format for one-shot commands
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Toon)]
	pub format: OutputFormat,

	/// JSON config file; missing keys keep their defaults
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Path to the dlv binary (default: found on PATH)
	#[arg(long, global = true, env = "GODBG_DLV", value_name = "PATH")]
	pub dlv: Option<PathBuf>,

	/// Path to the go toolchain binary (default: found on PATH)
	#[arg(long, global = true, env = "GODBG_GO", value_name = "PATH")]
	pub go: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Read NDJSON requests on stdin and answer one line per request
	Serve,

	/// List the commands accepted by `serve`
	#[command(alias = "ls")]
	Commands,

	/// Print the effective configuration
	Config,
}
