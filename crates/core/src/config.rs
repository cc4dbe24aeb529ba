//! Orchestrator configuration.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "dlvPath": "/opt/go/bin/dlv", "continueWaitMs": 10000 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DebugError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebuggerConfig {
	/// Explicit `dlv` binary; `PATH` is searched when unset.
	pub dlv_path: Option<PathBuf>,
	/// Explicit `go` binary used by the build helpers.
	pub go_path: Option<PathBuf>,
	/// Loopback host the backend listens on.
	pub listen_host: String,
	pub connect_timeout_ms: u64,
	pub connect_interval_ms: u64,
	/// Bound on the stop-wait after `continue`.
	pub continue_wait_ms: u64,
	/// Bound on the stop-wait before and after a step.
	pub step_wait_ms: u64,
	pub poll_interval_ms: u64,
	/// Bound on waiting for a running target before evaluating.
	pub eval_wait_ms: u64,
	pub detach_timeout_ms: u64,
	pub server_stop_timeout_ms: u64,
	pub live_queue_capacity: usize,
	/// Maximum records returned by one drain.
	pub drain_limit: usize,
	pub default_depth: u32,
	pub max_string_len: i64,
	pub max_array_values: i64,
	pub goroutine_limit: i64,
}

impl Default for DebuggerConfig {
	fn default() -> Self {
		Self {
			dlv_path: None,
			go_path: None,
			listen_host: "127.0.0.1".to_string(),
			connect_timeout_ms: 3_000,
			connect_interval_ms: 100,
			continue_wait_ms: 5_000,
			step_wait_ms: 2_000,
			poll_interval_ms: 100,
			eval_wait_ms: 2_000,
			detach_timeout_ms: 5_000,
			server_stop_timeout_ms: 5_000,
			live_queue_capacity: 1024,
			drain_limit: 100,
			default_depth: 1,
			max_string_len: 256,
			max_array_values: 64,
			goroutine_limit: 100,
		}
	}
}

impl DebuggerConfig {
	/// Reads a JSON config file; missing keys keep their defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).map_err(|e| DebugError::InvalidArgument(format!("cannot read config {}: {e}", path.display())))?;
		serde_json::from_str(&raw).map_err(|e| DebugError::InvalidArgument(format!("invalid config {}: {e}", path.display())))
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	pub fn connect_interval(&self) -> Duration {
		Duration::from_millis(self.connect_interval_ms.max(1))
	}

	pub fn continue_wait(&self) -> Duration {
		Duration::from_millis(self.continue_wait_ms)
	}

	pub fn step_wait(&self) -> Duration {
		Duration::from_millis(self.step_wait_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.max(1))
	}

	pub fn eval_wait(&self) -> Duration {
		Duration::from_millis(self.eval_wait_ms)
	}

	pub fn detach_timeout(&self) -> Duration {
		Duration::from_millis(self.detach_timeout_ms)
	}

	pub fn server_stop_timeout(&self) -> Duration {
		Duration::from_millis(self.server_stop_timeout_ms)
	}
}
