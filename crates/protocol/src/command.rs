//! Execution commands, session-level payloads and RPC method names.

use serde::{Deserialize, Serialize};

use crate::breakpoint::DiscardedBreakpoint;
use crate::null_as_default;
use crate::state::DebuggerState;

/// Fully qualified RPC method names served by `RPCServer`.
pub mod method {
	pub const STATE: &str = "RPCServer.State";
	pub const COMMAND: &str = "RPCServer.Command";
	pub const CREATE_BREAKPOINT: &str = "RPCServer.CreateBreakpoint";
	pub const LIST_BREAKPOINTS: &str = "RPCServer.ListBreakpoints";
	pub const CLEAR_BREAKPOINT: &str = "RPCServer.ClearBreakpoint";
	pub const EVAL: &str = "RPCServer.Eval";
	pub const LIST_LOCAL_VARS: &str = "RPCServer.ListLocalVars";
	pub const LIST_FUNCTION_ARGS: &str = "RPCServer.ListFunctionArgs";
	pub const LIST_GOROUTINES: &str = "RPCServer.ListGoroutines";
	pub const RESTART: &str = "RPCServer.Restart";
	pub const DETACH: &str = "RPCServer.Detach";
}

/// Names accepted by `DebuggerCommand.name`.
pub mod command_name {
	pub const CONTINUE: &str = "continue";
	pub const NEXT: &str = "next";
	pub const STEP: &str = "step";
	pub const STEP_OUT: &str = "stepOut";
	pub const HALT: &str = "halt";
}

/// Input of `RPCServer.Command`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebuggerCommand {
	pub name: String,
	#[serde(rename = "threadID", default, skip_serializing_if = "is_zero")]
	pub thread_id: i64,
	#[serde(rename = "goroutineID", default, skip_serializing_if = "is_zero")]
	pub goroutine_id: i64,
}

fn is_zero(value: &i64) -> bool {
	*value == 0
}

impl DebuggerCommand {
	pub fn named(name: &str) -> Self {
		Self {
			name: name.to_string(),
			..Default::default()
		}
	}
}

/// Output of `RPCServer.Command`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOut {
	#[serde(rename = "State")]
	pub state: DebuggerState,
}

/// Input of `RPCServer.Detach`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetachIn {
	#[serde(rename = "Kill")]
	pub kill: bool,
}

/// Input of `RPCServer.Restart`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartIn {
	#[serde(rename = "Position", skip_serializing_if = "String::is_empty")]
	pub position: String,
	#[serde(rename = "ResetArgs")]
	pub reset_args: bool,
	#[serde(rename = "NewArgs")]
	pub new_args: Vec<String>,
	#[serde(rename = "Rerecord")]
	pub rerecord: bool,
	#[serde(rename = "Rebuild")]
	pub rebuild: bool,
}

/// Output of `RPCServer.Restart`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartOut {
	#[serde(rename = "DiscardedBreakpoints", deserialize_with = "null_as_default")]
	pub discarded_breakpoints: Vec<DiscardedBreakpoint>,
}
