//! Debugger state snapshot types (`api.DebuggerState` and friends).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::breakpoint::Breakpoint;
use crate::null_as_default;
use crate::variable::Variable;

/// Snapshot of the target as reported by `RPCServer.State` and `RPCServer.Command`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerState {
	#[serde(rename = "Pid")]
	pub pid: i64,
	#[serde(rename = "TargetCommandLine")]
	pub target_command_line: String,
	#[serde(rename = "Running")]
	pub running: bool,
	#[serde(rename = "Recording")]
	pub recording: bool,
	#[serde(rename = "CoreDumping")]
	pub core_dumping: bool,
	#[serde(rename = "currentThread", skip_serializing_if = "Option::is_none")]
	pub current_thread: Option<Thread>,
	#[serde(rename = "currentGoroutine", skip_serializing_if = "Option::is_none")]
	pub selected_goroutine: Option<Goroutine>,
	#[serde(rename = "Threads", deserialize_with = "null_as_default")]
	pub threads: Vec<Thread>,
	#[serde(rename = "NextInProgress")]
	pub next_in_progress: bool,
	#[serde(rename = "WatchOutOfScope", deserialize_with = "null_as_default")]
	pub watch_out_of_scope: Vec<Breakpoint>,
	pub exited: bool,
	#[serde(rename = "exitStatus")]
	pub exit_status: i32,
	#[serde(rename = "When")]
	pub when: String,
}

/// An OS thread of the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thread {
	pub id: i64,
	pub pc: u64,
	pub file: String,
	pub line: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<Function>,
	#[serde(rename = "goroutineID")]
	pub goroutine_id: i64,
	#[serde(rename = "breakPoint", skip_serializing_if = "Option::is_none")]
	pub breakpoint: Option<Breakpoint>,
	#[serde(rename = "breakPointInfo", skip_serializing_if = "Option::is_none")]
	pub breakpoint_info: Option<BreakpointInfo>,
	#[serde(rename = "ReturnValues", deserialize_with = "null_as_default")]
	pub return_values: Vec<Variable>,
	#[serde(rename = "CallReturn")]
	pub call_return: bool,
}

/// Extra information collected when a thread stops at a breakpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakpointInfo {
	#[serde(deserialize_with = "null_as_default")]
	pub arguments: Vec<Variable>,
	#[serde(deserialize_with = "null_as_default")]
	pub locals: Vec<Variable>,
	#[serde(deserialize_with = "null_as_default")]
	pub variables: Vec<Variable>,
}

/// A goroutine of the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goroutine {
	pub id: i64,
	#[serde(rename = "currentLoc")]
	pub current_loc: Location,
	#[serde(rename = "userCurrentLoc")]
	pub user_current_loc: Location,
	#[serde(rename = "goStatementLoc")]
	pub go_statement_loc: Location,
	#[serde(rename = "startLoc")]
	pub start_loc: Location,
	#[serde(rename = "threadID")]
	pub thread_id: i64,
	pub status: u64,
	#[serde(rename = "waitSince")]
	pub wait_since: i64,
	#[serde(rename = "waitReason")]
	pub wait_reason: i64,
	pub unreadable: String,
	#[serde(deserialize_with = "null_as_default", skip_serializing_if = "HashMap::is_empty")]
	pub labels: HashMap<String, String>,
}

/// A program location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
	pub pc: u64,
	pub file: String,
	pub line: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<Function>,
	#[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub pcs: Vec<u64>,
}

/// A function symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Function {
	pub name: String,
	pub value: u64,
	#[serde(rename = "type")]
	pub kind: u8,
	#[serde(rename = "goType")]
	pub go_type: u64,
	pub optimized: bool,
}

/// Input of `RPCServer.State`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateIn {
	#[serde(rename = "NonBlocking")]
	pub non_blocking: bool,
}

/// Output of `RPCServer.State`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateOut {
	#[serde(rename = "State")]
	pub state: Option<DebuggerState>,
}

/// Input of `RPCServer.ListGoroutines`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListGoroutinesIn {
	#[serde(rename = "Start")]
	pub start: i64,
	#[serde(rename = "Count")]
	pub count: i64,
}

/// Output of `RPCServer.ListGoroutines`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListGoroutinesOut {
	#[serde(rename = "Goroutines", deserialize_with = "null_as_default")]
	pub goroutines: Vec<Goroutine>,
	#[serde(rename = "Nextg")]
	pub nextg: i64,
}
