//! Error type for orchestrator operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DebugError>;

#[derive(Debug, Error)]
pub enum DebugError {
	#[error("no active debug session; launch or attach first")]
	NoActiveSession,

	#[error("a debug session is already active for {target}; close it first")]
	SessionActive { target: String },

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("launch failed: {0}")]
	LaunchFailed(String),

	#[error("backend error: {0}")]
	Backend(#[source] godbg_runtime::Error),

	#[error("breakpoint {id} not found")]
	BreakpointNotFound { id: i64 },

	#[error("process has exited with status {exit_code}; only close or restart are possible")]
	ProcessExited { exit_code: i32 },

	#[error("program is still running; interrupt it or wait for it to stop")]
	ProgramRunning,

	#[error("no thread or goroutine is selected")]
	NoSelectedThread,

	#[error("evaluating `{expr}` failed: {message}")]
	EvalFailed { expr: String, message: String },

	#[error("build failed: {0}")]
	BuildFailed(String),

	#[error("timed out after {timeout_ms}ms connecting to debug backend at {address}")]
	ConnectTimeout { address: String, timeout_ms: u64 },
}

impl DebugError {
	/// Stable machine-readable code for this error.
	pub fn code(&self) -> &'static str {
		match self {
			DebugError::NoActiveSession => "NO_ACTIVE_SESSION",
			DebugError::SessionActive { .. } => "SESSION_ACTIVE",
			DebugError::InvalidArgument(_) => "INVALID_ARGUMENT",
			DebugError::LaunchFailed(_) => "LAUNCH_FAILED",
			DebugError::Backend(_) => "BACKEND_ERROR",
			DebugError::BreakpointNotFound { .. } => "BREAKPOINT_NOT_FOUND",
			DebugError::ProcessExited { .. } => "PROCESS_EXITED",
			DebugError::ProgramRunning => "PROGRAM_RUNNING",
			DebugError::NoSelectedThread => "NO_SELECTED_THREAD",
			DebugError::EvalFailed { .. } => "EVAL_FAILED",
			DebugError::BuildFailed(_) => "BUILD_FAILED",
			DebugError::ConnectTimeout { .. } => "CONNECT_TIMEOUT",
		}
	}

	/// Precondition failures are detected locally, before any backend call.
	pub fn is_precondition(&self) -> bool {
		matches!(
			self,
			DebugError::NoActiveSession | DebugError::SessionActive { .. } | DebugError::InvalidArgument(_) | DebugError::ProcessExited { .. }
		)
	}
}

impl From<godbg_runtime::Error> for DebugError {
	fn from(err: godbg_runtime::Error) -> Self {
		match err {
			godbg_runtime::Error::ProcessExited { status, .. } => DebugError::ProcessExited { exit_code: status },
			godbg_runtime::Error::ConnectTimeout { address, timeout_ms } => DebugError::ConnectTimeout { address, timeout_ms },
			other => DebugError::Backend(other),
		}
	}
}
