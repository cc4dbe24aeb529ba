//! The single active debugging engagement and its stop-wait machinery.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use godbg_protocol::{DebuggerState, EvalScope};
use godbg_runtime::{BackendProcess, DelveClient, PendingState};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::compile::BuiltBinary;
use crate::error::{DebugError, Result};
use crate::model::SessionMode;
use crate::output::OutputCapture;
use crate::projector::Snapshot;

/// What the session is debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	Program { path: PathBuf, args: Vec<String> },
	Process { pid: u32 },
	Remote { address: String },
}

impl Target {
	pub fn mode(&self) -> SessionMode {
		match self {
			Target::Program { .. } => SessionMode::Launch,
			Target::Process { .. } => SessionMode::Attach,
			Target::Remote { .. } => SessionMode::Connect,
		}
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Target::Program { path, .. } => write!(f, "{}", path.display()),
			Target::Process { pid } => write!(f, "pid {pid}"),
			Target::Remote { address } => write!(f, "{address}"),
		}
	}
}

/// Outcome of a bounded stop-wait.
#[derive(Debug)]
pub(crate) struct StopWait {
	pub snapshot: Snapshot,
	pub timed_out: bool,
}

pub(crate) struct Session {
	pub client: DelveClient,
	pub target: Target,
	pub address: String,
	pub backend: Option<BackendProcess>,
	pub output: OutputCapture,
	/// dlv's own stderr in attach mode, kept apart from target output.
	pub backend_log: Option<OutputCapture>,
	pub build: Option<BuiltBinary>,
	/// In-flight execution command whose state has not been consumed.
	pub resume: Option<PendingState>,
	/// Exit code once the target has been observed to exit.
	pub exit_code: Option<i32>,
}

impl Session {
	pub fn new(client: DelveClient, target: Target, address: String) -> Self {
		Self {
			client,
			target,
			address,
			backend: None,
			output: OutputCapture::empty(),
			backend_log: None,
			build: None,
			resume: None,
			exit_code: None,
		}
	}

	/// Fails fast once the target has exited.
	pub fn ensure_alive(&self) -> Result<()> {
		match self.exit_code {
			Some(exit_code) => Err(DebugError::ProcessExited { exit_code }),
			None => Ok(()),
		}
	}

	/// Folds a backend answer into a snapshot, recording exits.
	pub fn observe(&mut self, result: godbg_runtime::Result<DebuggerState>) -> Result<Snapshot> {
		let snapshot = match result {
			Ok(state) => Snapshot::live(state),
			Err(err) if err.is_process_exited() => Snapshot::Exited {
				status: err.exit_status().unwrap_or_default(),
			},
			Err(err) => return Err(err.into()),
		};
		if let Some(code) = snapshot.exit_code() {
			if self.exit_code.is_none() {
				debug!(target = "godbg.session", exit_code = code, "target exited");
			}
			self.exit_code = Some(code);
			self.resume = None;
		}
		Ok(snapshot)
	}

	/// Current state without blocking on a running target.
	pub async fn snapshot(&mut self) -> Result<Snapshot> {
		if let Some(status) = self.exit_code {
			return Ok(Snapshot::Exited { status });
		}
		let result = self.client.state(true).await;
		self.observe(result)
	}

	/// Issues an execution command and keeps its reply pending.
	pub async fn start_command(&mut self, name: &str) -> Result<()> {
		let pending = self.client.start_command(godbg_protocol::DebuggerCommand::named(name)).await?;
		self.resume = Some(pending);
		Ok(())
	}

	/// Consumes the pending command's reply if it arrives within `limit`.
	async fn take_resume_result(&mut self, limit: Duration) -> Result<Option<Snapshot>> {
		let Some(pending) = self.resume.as_mut() else {
			return Ok(None);
		};
		match pending.wait_timeout(limit).await {
			None => Ok(None),
			Some(result) => {
				self.resume = None;
				self.observe(result).map(Some)
			}
		}
	}

	/// Polls until the target is no longer running or `limit` elapses.
	///
	/// A timeout is not an error: the last observed snapshot comes back with
	/// `timed_out` set.
	pub async fn wait_for_stop(&mut self, limit: Duration, poll: Duration) -> Result<StopWait> {
		let deadline = Instant::now() + limit;
		loop {
			let slice = poll.min(deadline.saturating_duration_since(Instant::now()));
			if let Some(snapshot) = self.take_resume_result(slice).await? {
				if !snapshot.is_running() {
					return Ok(StopWait { snapshot, timed_out: false });
				}
			}

			let snapshot = self.snapshot().await?;
			if !snapshot.is_running() {
				// The command reply trails the stop slightly and carries the richer state.
				if let Some(settled) = self.take_resume_result(poll).await? {
					return Ok(StopWait {
						snapshot: settled,
						timed_out: false,
					});
				}
				// The stop is authoritative; a reply still owed belongs to a finished command.
				if self.resume.take().is_some() {
					debug!(target = "godbg.control", "discarding command reply that trailed the stop");
				}
				return Ok(StopWait { snapshot, timed_out: false });
			}

			if Instant::now() >= deadline {
				debug!(target = "godbg.control", limit_ms = limit.as_millis() as u64, "stop-wait timed out");
				return Ok(StopWait { snapshot, timed_out: true });
			}
			if self.resume.is_none() {
				tokio::time::sleep(slice).await;
			}
		}
	}

	/// Waits up to `limit` for a running target and fails if it keeps running.
	pub async fn require_stopped(&mut self, limit: Duration, poll: Duration) -> Result<Snapshot> {
		let wait = self.wait_for_stop(limit, poll).await?;
		if wait.timed_out {
			return Err(DebugError::ProgramRunning);
		}
		if let Some(exit_code) = wait.snapshot.exit_code() {
			return Err(DebugError::ProcessExited { exit_code });
		}
		Ok(wait.snapshot)
	}

	/// Stops output readers, detaches, and stops the backend, each step time-boxed.
	///
	/// Returns warnings for steps that did not finish cleanly.
	pub async fn teardown(mut self, detach_timeout: Duration, stop_timeout: Duration) -> Vec<String> {
		let mut warnings = Vec::new();
		self.output.shutdown();
		if let Some(log) = self.backend_log.as_mut() {
			log.shutdown();
		}
		self.resume = None;

		match &self.target {
			Target::Remote { .. } => {}
			target => {
				let kill = matches!(target, Target::Program { .. });
				match tokio::time::timeout(detach_timeout, self.client.detach(kill)).await {
					Ok(Ok(())) => debug!(target = "godbg.session", kill, "detached"),
					Ok(Err(e)) if e.is_process_exited() => debug!(target = "godbg.session", "target already gone at detach"),
					Ok(Err(e)) => {
						warn!(target = "godbg.session", error = %e, "detach failed");
						warnings.push(format!("detach failed: {e}"));
					}
					Err(_) => {
						warn!(target = "godbg.session", timeout_ms = detach_timeout.as_millis() as u64, "detach timed out");
						warnings.push(format!("detach timed out after {}ms", detach_timeout.as_millis()));
					}
				}
			}
		}
		self.client.shutdown();

		if let Some(mut backend) = self.backend.take() {
			if !backend.stop(stop_timeout).await {
				warnings.push(format!("backend did not stop within {}ms and was killed", stop_timeout.as_millis()));
			}
		}
		if let Some(build) = self.build.take() {
			debug!(target = "godbg.session", dir = %build.dir().display(), "removing build directory");
		}
		warnings
	}
}

/// Evaluation scope for the selected goroutine's top frame.
pub(crate) fn eval_scope(snapshot: &Snapshot) -> Result<EvalScope> {
	let Snapshot::Live(state) = snapshot else {
		return Err(DebugError::NoSelectedThread);
	};
	let goroutine_id = match (&state.selected_goroutine, &state.current_thread) {
		(Some(g), _) if g.id > 0 => g.id,
		(_, Some(t)) if t.goroutine_id > 0 => t.goroutine_id,
		(_, Some(_)) => -1,
		_ => return Err(DebugError::NoSelectedThread),
	};
	Ok(EvalScope {
		goroutine_id,
		frame: 0,
		deferred_call: 0,
	})
}
