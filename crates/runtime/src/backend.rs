//! Headless `dlv` process lifecycle.
//!
//! A backend is always started with `--headless --api-version=2 --accept-multiclient`
//! on a freshly allocated loopback port. Multiclient mode keeps the server alive when a
//! connection attempt is dropped, which the connect loop relies on.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::process::free_port;

/// What the backend should debug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMode {
	/// Start `program` with `args` under the debugger, halted at entry.
	Exec { program: PathBuf, args: Vec<String> },
	/// Attach to a running process.
	Attach { pid: u32 },
}

/// Everything needed to start a backend.
#[derive(Debug, Clone)]
pub struct BackendSpec {
	pub dlv_path: PathBuf,
	pub host: String,
	pub mode: BackendMode,
	pub working_dir: Option<PathBuf>,
}

/// Pipes handed to the output capture after spawning.
///
/// In attach mode the target's stdio belongs to someone else, so `stdout` is `None`.
#[derive(Debug, Default)]
pub struct BackendStdio {
	pub stdout: Option<ChildStdout>,
	pub stderr: Option<ChildStderr>,
}

/// A running `dlv` server owned by a session.
#[derive(Debug)]
pub struct BackendProcess {
	child: Child,
	address: String,
}

/// Resolves the `dlv` binary: an explicit path wins, otherwise `PATH` is searched.
pub fn locate_dlv(explicit: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		if path.components().count() > 1 {
			return if path.is_file() {
				Ok(path.to_path_buf())
			} else {
				Err(Error::BackendNotFound(format!("{} does not exist", path.display())))
			};
		}
		return which::which(path).map_err(|e| Error::BackendNotFound(format!("{}: {e}", path.display())));
	}
	which::which("dlv").map_err(|_| {
		Error::BackendNotFound("dlv was not found on PATH; install it with `go install github.com/go-delve/delve/cmd/dlv@latest`".to_string())
	})
}

/// Builds the `dlv` argument vector for `mode` listening on `address`.
pub fn backend_args(mode: &BackendMode, address: &str) -> Vec<String> {
	let mut args = Vec::new();
	match mode {
		BackendMode::Exec { program, .. } => {
			args.push("exec".to_string());
			args.push(program.display().to_string());
		}
		BackendMode::Attach { pid } => {
			args.push("attach".to_string());
			args.push(pid.to_string());
		}
	}
	args.extend([
		"--headless".to_string(),
		"--api-version=2".to_string(),
		"--accept-multiclient".to_string(),
		format!("--listen={address}"),
	]);
	if let BackendMode::Exec { args: program_args, .. } = mode {
		if !program_args.is_empty() {
			args.push("--".to_string());
			args.extend(program_args.iter().cloned());
		}
	}
	args
}

impl BackendProcess {
	/// Allocates a port and spawns `dlv` for `spec`.
	pub fn spawn(spec: &BackendSpec) -> Result<(Self, BackendStdio)> {
		let port = free_port(&spec.host)?;
		let address = format!("{}:{port}", spec.host);
		let args = backend_args(&spec.mode, &address);

		let mut cmd = Command::new(&spec.dlv_path);
		cmd.args(&args).stdin(Stdio::null()).stderr(Stdio::piped()).kill_on_drop(true);
		match spec.mode {
			BackendMode::Exec { .. } => {
				cmd.stdout(Stdio::piped());
			}
			BackendMode::Attach { .. } => {
				cmd.stdout(Stdio::null());
			}
		}
		if let Some(dir) = &spec.working_dir {
			cmd.current_dir(dir);
		}

		#[cfg(unix)]
		cmd.process_group(0);

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::BackendStartup(format!("failed to start {}: {e}", spec.dlv_path.display())))?;

		info!(target = "godbg.backend", pid = ?child.id(), %address, mode = ?spec.mode, "backend started");

		let stdio = BackendStdio {
			stdout: child.stdout.take(),
			stderr: child.stderr.take(),
		};
		Ok((Self { child, address }, stdio))
	}

	/// The `host:port` the server listens on.
	pub fn address(&self) -> &str {
		&self.address
	}

	pub fn id(&self) -> Option<u32> {
		self.child.id()
	}

	/// Non-blocking exit check.
	pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
		match self.child.try_wait() {
			Ok(status) => status,
			Err(e) => {
				debug!(target = "godbg.backend", error = %e, "try_wait failed");
				None
			}
		}
	}

	/// Waits up to `grace` for the server to exit on its own, then kills it.
	///
	/// Returns `true` when the server exited within `grace`.
	pub async fn stop(&mut self, grace: Duration) -> bool {
		match tokio::time::timeout(grace, self.child.wait()).await {
			Ok(Ok(status)) => {
				debug!(target = "godbg.backend", %status, "backend exited");
				true
			}
			Ok(Err(e)) => {
				warn!(target = "godbg.backend", error = %e, "waiting for backend failed; killing");
				let _ = self.child.kill().await;
				false
			}
			Err(_) => {
				warn!(target = "godbg.backend", timeout_ms = grace.as_millis() as u64, "backend did not exit in time; killing");
				if let Err(e) = self.child.kill().await {
					warn!(target = "godbg.backend", error = %e, "failed to kill backend");
				}
				false
			}
		}
	}
}
