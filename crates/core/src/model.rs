//! Serializable session-state model returned by every operation.
//!
//! These types are the stable face of the orchestrator: backend payloads are
//! projected into them (see [`crate::projector`]) and never exposed raw.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Coarse run state of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
	Running,
	Stopped,
	Stepping,
	Exited,
}

impl fmt::Display for ExecutionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Running => write!(f, "running"),
			Self::Stopped => write!(f, "stopped"),
			Self::Stepping => write!(f, "stepping"),
			Self::Exited => write!(f, "exited"),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
	pub file: String,
	pub line: i64,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub function: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub package: String,
}

impl SourceLocation {
	/// `file:line` with only the file's base name.
	pub fn short(&self) -> String {
		let name = self.file.rsplit(['/', '\\']).next().unwrap_or(&self.file);
		format!("{name}:{}", self.line)
	}
}

/// Snapshot of the target, rebuilt from the backend on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
	pub status: ExecutionStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub goroutine_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<SourceLocation>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exit_code: Option<i32>,
	pub reason: String,
	/// Set when a bounded wait elapsed before the target settled.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
	pub id: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub goroutine_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<SourceLocation>,
	pub current: bool,
}

/// Envelope attached to every successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugContext {
	pub state: ExecutionState,
	pub last_operation: String,
	pub summary: String,
	pub next_actions: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub threads: Option<Vec<ThreadSummary>>,
	/// Milliseconds since the Unix epoch.
	pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
	pub id: i64,
	pub location: SourceLocation,
	pub enabled: bool,
	pub hit: bool,
	pub hit_count: u64,
	pub description: String,
}

/// Coarse classification of a variable's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
	Boolean,
	Integer,
	Float,
	String,
	Array,
	Map,
	Struct,
	Pointer,
	Interface,
	Channel,
	Function,
	Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
	pub name: String,
	#[serde(rename = "type")]
	pub type_name: String,
	pub value: String,
	pub kind: VariableKind,
	/// Expression that evaluates to this value; feed it back to `evaluate` to expand further.
	pub expression: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub length: Option<i64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<Variable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
	Stdout,
	Stderr,
}

impl fmt::Display for OutputStream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Stdout => write!(f, "stdout"),
			Self::Stderr => write!(f, "stderr"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
	pub stream: OutputStream,
	pub text: String,
	pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineSummary {
	pub id: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<SourceLocation>,
	pub current: bool,
}

/// How the session reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
	Launch,
	Attach,
	Connect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
	pub mode: SessionMode,
	pub target: String,
	pub address: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pid: Option<i64>,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
	/// `false` when there was nothing to close.
	pub closed: bool,
	pub message: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResponse {
	pub breakpoint: Breakpoint,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointListResponse {
	pub breakpoints: Vec<Breakpoint>,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
	pub variable: Variable,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeResponse {
	pub locals: Vec<Variable>,
	pub arguments: Vec<Variable>,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutinesResponse {
	pub goroutines: Vec<GoroutineSummary>,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartResponse {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub discarded_breakpoints: Vec<String>,
	pub context: DebugContext,
}

/// Full captured history of both streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResponse {
	pub stdout: String,
	pub stderr: String,
	pub context: DebugContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecordsResponse {
	pub records: Vec<OutputRecord>,
	pub context: DebugContext,
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
