//! NDJSON request loop over stdin/stdout.
//!
//! Each input line is one [`BatchRequest`]; each produces exactly one response
//! line. `quit` (or end of input) closes any active session before returning.

use godbg::{Debugger, DebuggerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::dispatch::{BatchRequest, BatchResponse, execute_batch_command};
use super::registry::{CommandId, lookup_command};
use crate::error::Result;
use crate::output::{ErrorCode, ResultBuilder};

pub async fn run_serve(config: DebuggerConfig) -> Result<()> {
	let mut debugger = Debugger::new(config);
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	let mut stdout = tokio::io::stdout();
	info!(target = "godbg.cli", "serving requests on stdin");

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let request = match serde_json::from_str::<BatchRequest>(line) {
			Ok(request) => request,
			Err(e) => {
				warn!(target = "godbg.cli", error = %e, "malformed request line");
				let response: BatchResponse = ResultBuilder::new("unknown")
					.error(ErrorCode::InvalidInput, format!("malformed request: {e}"))
					.build();
				write_line(&mut stdout, &response).await?;
				continue;
			}
		};

		let response = execute_batch_command(&mut debugger, &request).await;
		write_line(&mut stdout, &response).await?;
		if lookup_command(&request.command) == Some(CommandId::Quit) {
			debug!(target = "godbg.cli", "quit requested");
			return Ok(());
		}
	}

	if debugger.is_active() {
		info!(target = "godbg.cli", "input closed; closing active session");
		debugger.close().await?;
	}
	Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, response: &BatchResponse) -> Result<()> {
	let mut text = serde_json::to_string(response)?;
	text.push('\n');
	stdout.write_all(text.as_bytes()).await?;
	stdout.flush().await?;
	Ok(())
}
