use godbg::DebugError;
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned for every request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	/// Echo of the request id, when the request carried one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	NoActiveSession,
	SessionActive,
	InvalidArgument,
	LaunchFailed,
	BackendError,
	BreakpointNotFound,
	ProcessExited,
	ProgramRunning,
	NoSelectedThread,
	EvalFailed,
	BuildFailed,
	ConnectTimeout,
	UnknownCommand,
	InvalidInput,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::NoActiveSession => write!(f, "NO_ACTIVE_SESSION"),
			ErrorCode::SessionActive => write!(f, "SESSION_ACTIVE"),
			ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
			ErrorCode::LaunchFailed => write!(f, "LAUNCH_FAILED"),
			ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
			ErrorCode::BreakpointNotFound => write!(f, "BREAKPOINT_NOT_FOUND"),
			ErrorCode::ProcessExited => write!(f, "PROCESS_EXITED"),
			ErrorCode::ProgramRunning => write!(f, "PROGRAM_RUNNING"),
			ErrorCode::NoSelectedThread => write!(f, "NO_SELECTED_THREAD"),
			ErrorCode::EvalFailed => write!(f, "EVAL_FAILED"),
			ErrorCode::BuildFailed => write!(f, "BUILD_FAILED"),
			ErrorCode::ConnectTimeout => write!(f, "CONNECT_TIMEOUT"),
			ErrorCode::UnknownCommand => write!(f, "UNKNOWN_COMMAND"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

impl From<&DebugError> for ErrorCode {
	fn from(err: &DebugError) -> Self {
		match err {
			DebugError::NoActiveSession => ErrorCode::NoActiveSession,
			DebugError::SessionActive { .. } => ErrorCode::SessionActive,
			DebugError::InvalidArgument(_) => ErrorCode::InvalidArgument,
			DebugError::LaunchFailed(_) => ErrorCode::LaunchFailed,
			DebugError::Backend(_) => ErrorCode::BackendError,
			DebugError::BreakpointNotFound { .. } => ErrorCode::BreakpointNotFound,
			DebugError::ProcessExited { .. } => ErrorCode::ProcessExited,
			DebugError::ProgramRunning => ErrorCode::ProgramRunning,
			DebugError::NoSelectedThread => ErrorCode::NoSelectedThread,
			DebugError::EvalFailed { .. } => ErrorCode::EvalFailed,
			DebugError::BuildFailed(_) => ErrorCode::BuildFailed,
			DebugError::ConnectTimeout { .. } => ErrorCode::ConnectTimeout,
		}
	}
}

impl CommandError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			details: None,
		}
	}
}

impl From<&DebugError> for CommandError {
	fn from(err: &DebugError) -> Self {
		let details = match err {
			DebugError::ProcessExited { exit_code } => Some(serde_json::json!({ "exitCode": exit_code })),
			DebugError::BreakpointNotFound { id } => Some(serde_json::json!({ "id": id })),
			DebugError::EvalFailed { expr, .. } => Some(serde_json::json!({ "expression": expr })),
			_ => None,
		};
		Self {
			code: ErrorCode::from(err),
			message: err.to_string(),
			details,
		}
	}
}
