//! Error types for backend lifecycle and RPC communication.

use thiserror::Error;

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("connection to debug backend closed")]
	ChannelClosed,

	#[error("{method} failed: {message}")]
	Rpc { method: String, message: String },

	#[error("process {pid} has exited with status {status}")]
	ProcessExited { pid: i64, status: i32 },

	#[error("protocol error: {0}")]
	ProtocolError(String),

	#[error("debug backend not found: {0}")]
	BackendNotFound(String),

	#[error("debug backend failed to start: {0}")]
	BackendStartup(String),

	#[error("debug backend exited before accepting connections ({status})")]
	BackendExited { status: String },

	#[error("timed out after {timeout_ms}ms connecting to debug backend at {address}")]
	ConnectTimeout { address: String, timeout_ms: u64 },
}

impl Error {
	/// Returns `true` when the backend reported that the target process is gone.
	pub fn is_process_exited(&self) -> bool {
		matches!(self, Error::ProcessExited { .. })
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::ConnectTimeout { .. })
	}

	/// Exit status of the target when this error reports a finished process.
	pub fn exit_status(&self) -> Option<i32> {
		match self {
			Error::ProcessExited { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Parses Delve's `Process <pid> has exited with status <n>` message.
pub fn parse_process_exited(message: &str) -> Option<(i64, i32)> {
	const MARKER: &str = " has exited with status ";
	let at = message.find(MARKER)?;
	let head = &message[..at];
	let pid = head.rsplit(' ').next()?.trim().parse().ok()?;
	let tail = &message[at + MARKER.len()..];
	let digits: String = tail
		.chars()
		.enumerate()
		.take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
		.map(|(_, c)| c)
		.collect();
	let status = digits.parse().ok()?;
	Some((pid, status))
}
