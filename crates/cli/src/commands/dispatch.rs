//! Maps one request onto one orchestrator call.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use godbg::{DebugError, Debugger};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::commands::registry::{CommandId, command_name, lookup_command};
use crate::output::{CommandError, CommandResult, ErrorCode, ResultBuilder};

/// One NDJSON request line: `{"id":"1","command":"continue","args":{}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
	#[serde(default, deserialize_with = "id_as_string")]
	pub id: Option<String>,
	pub command: String,
	#[serde(default)]
	pub args: Value,
}

pub type BatchResponse = CommandResult<Value>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LaunchArgs {
	program: PathBuf,
	#[serde(default)]
	args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AttachArgs {
	pid: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConnectArgs {
	address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SourceArgs {
	file: PathBuf,
	#[serde(default)]
	args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TestArgs {
	file: PathBuf,
	test_name: String,
	#[serde(default)]
	args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BreakpointArgs {
	file: String,
	line: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RemoveArgs {
	id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EvalArgs {
	#[serde(alias = "expr")]
	expression: String,
	depth: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DepthArgs {
	depth: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WaitArgs {
	timeout_ms: Option<u64>,
}

enum Failure {
	Input(String),
	Debug(DebugError),
}

impl From<DebugError> for Failure {
	fn from(err: DebugError) -> Self {
		Failure::Debug(err)
	}
}

/// Executes one request against the debugger and builds its response.
pub async fn execute_batch_command(debugger: &mut Debugger, request: &BatchRequest) -> BatchResponse {
	let started = Instant::now();
	let Some(id) = lookup_command(&request.command) else {
		return ResultBuilder::new(request.command.as_str())
			.id(request.id.clone())
			.error(ErrorCode::UnknownCommand, format!("Unknown command: {}", request.command))
			.build();
	};

	let name = command_name(id);
	debug!(target = "godbg.cli", command = name, id = ?request.id, "dispatching");
	let builder = ResultBuilder::new(name).id(request.id.clone()).started_at(started);
	match run(debugger, id, request.args.clone()).await {
		Ok(data) => builder.data(data).build(),
		Err(Failure::Input(message)) => builder.error(ErrorCode::InvalidInput, message).build(),
		Err(Failure::Debug(err)) => builder.command_error(CommandError::from(&err)).build(),
	}
}

async fn run(debugger: &mut Debugger, id: CommandId, args: Value) -> Result<Value, Failure> {
	Ok(match id {
		CommandId::Launch => {
			let a: LaunchArgs = parse(args)?;
			to_value(debugger.launch(&a.program, &a.args).await?)
		}
		CommandId::Attach => {
			let a: AttachArgs = parse(args)?;
			to_value(debugger.attach(a.pid).await?)
		}
		CommandId::Connect => {
			let a: ConnectArgs = parse(args)?;
			to_value(debugger.connect(&a.address).await?)
		}
		CommandId::DebugSource => {
			let a: SourceArgs = parse(args)?;
			to_value(debugger.debug_source(&a.file, &a.args).await?)
		}
		CommandId::DebugTest => {
			let a: TestArgs = parse(args)?;
			to_value(debugger.debug_test(&a.file, &a.test_name, &a.args).await?)
		}
		CommandId::Close | CommandId::Quit => to_value(debugger.close().await?),
		CommandId::State => to_value(debugger.state().await?),
		CommandId::Continue => to_value(debugger.continue_execution().await?),
		CommandId::Step => to_value(debugger.step().await?),
		CommandId::StepOver => to_value(debugger.step_over().await?),
		CommandId::StepOut => to_value(debugger.step_out().await?),
		CommandId::Interrupt => to_value(debugger.interrupt().await?),
		CommandId::Wait => {
			let a: WaitArgs = parse_optional(args)?;
			to_value(debugger.wait(a.timeout_ms.map(Duration::from_millis)).await?)
		}
		CommandId::Restart => to_value(debugger.restart().await?),
		CommandId::SetBreakpoint => {
			let a: BreakpointArgs = parse(args)?;
			to_value(debugger.set_breakpoint(&a.file, a.line).await?)
		}
		CommandId::ListBreakpoints => to_value(debugger.list_breakpoints().await?),
		CommandId::RemoveBreakpoint => {
			let a: RemoveArgs = parse(args)?;
			to_value(debugger.remove_breakpoint(a.id).await?)
		}
		CommandId::Evaluate => {
			let a: EvalArgs = parse(args)?;
			to_value(debugger.evaluate(&a.expression, a.depth).await?)
		}
		CommandId::ListScope => {
			let a: DepthArgs = parse_optional(args)?;
			to_value(debugger.list_scope(a.depth).await?)
		}
		CommandId::Goroutines => to_value(debugger.goroutines().await?),
		CommandId::GetOutput => to_value(debugger.get_output().await?),
		CommandId::PeekOutput => to_value(debugger.peek_output().await?),
		CommandId::DrainOutput => to_value(debugger.drain_output().await?),
	})
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, Failure> {
	serde_json::from_value(args).map_err(|e| Failure::Input(format!("invalid args: {e}")))
}

/// Like [`parse`], but a missing or null `args` means all defaults.
fn parse_optional<T: DeserializeOwned + Default>(args: Value) -> Result<T, Failure> {
	if args.is_null() {
		return Ok(T::default());
	}
	parse(args)
}

fn to_value<T: serde::Serialize>(response: T) -> Value {
	serde_json::to_value(response).unwrap_or(Value::Null)
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => None,
		Some(Value::String(s)) => Some(s),
		Some(other) => Some(other.to_string()),
	})
}
