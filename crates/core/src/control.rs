//! Execution control: the run/stop state machine.
//!
//! Resume and step requests are issued as pending calls. The controller then
//! waits, bounded, for the target to settle; a wait that runs out is reported
//! as a warning on the returned state instead of failing the operation.

use std::time::Duration;

use godbg_protocol::command_name;
use tracing::{debug, info};

use crate::debugger::Debugger;
use crate::error::Result;
use crate::model::StateResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
	Into,
	Over,
	Out,
}

impl StepKind {
	fn command(self) -> &'static str {
		match self {
			StepKind::Into => command_name::STEP,
			StepKind::Over => command_name::NEXT,
			StepKind::Out => command_name::STEP_OUT,
		}
	}

	fn operation(self) -> &'static str {
		match self {
			StepKind::Into => "step",
			StepKind::Over => "step_over",
			StepKind::Out => "step_out",
		}
	}
}

impl Debugger {
	/// Resumes the target and waits, bounded, for the next stop or exit.
	///
	/// When an earlier resume is still running, no new resume is issued; the
	/// call keeps waiting for that one so its stop is not skipped.
	pub async fn continue_execution(&mut self) -> Result<StateResponse> {
		let wait = self.config().continue_wait();
		let poll = self.config().poll_interval();
		let session = self.session_mut()?;
		session.ensure_alive()?;

		let already_running = session.resume.is_some() || session.snapshot().await?.is_running();
		if already_running {
			debug!(target = "godbg.control", "target already running; waiting on previous resume");
		} else {
			session.start_command(command_name::CONTINUE).await?;
			info!(target = "godbg.control", "continue issued");
		}

		let result = session.wait_for_stop(wait, poll).await?;
		let warning = result
			.timed_out
			.then(|| format!("program still running after {}ms; use interrupt to pause it or wait again", wait.as_millis()));
		Ok(StateResponse {
			context: self.context("continue", &result.snapshot, warning),
		})
	}

	/// Steps into the next call.
	pub async fn step(&mut self) -> Result<StateResponse> {
		self.step_with(StepKind::Into).await
	}

	/// Steps to the next line in the current frame.
	pub async fn step_over(&mut self) -> Result<StateResponse> {
		self.step_with(StepKind::Over).await
	}

	/// Runs until the current function returns.
	pub async fn step_out(&mut self) -> Result<StateResponse> {
		self.step_with(StepKind::Out).await
	}

	async fn step_with(&mut self, kind: StepKind) -> Result<StateResponse> {
		let wait = self.config().step_wait();
		let poll = self.config().poll_interval();
		let session = self.session_mut()?;
		session.ensure_alive()?;

		// Steps against a running target are rejected by the backend.
		session.require_stopped(wait, poll).await?;

		session.start_command(kind.command()).await?;
		debug!(target = "godbg.control", command = kind.command(), "step issued");

		let result = session.wait_for_stop(wait, poll).await?;
		let warning = result
			.timed_out
			.then(|| format!("step did not settle within {}ms; the program is still running", wait.as_millis()));
		Ok(StateResponse {
			context: self.context(kind.operation(), &result.snapshot, warning),
		})
	}

	/// Halts a running target. A stopped target is reported as is.
	pub async fn interrupt(&mut self) -> Result<StateResponse> {
		let poll = self.config().poll_interval();
		let session = self.session_mut()?;
		session.ensure_alive()?;

		let current = session.snapshot().await?;
		if !current.is_running() && session.resume.is_none() {
			return Ok(StateResponse {
				context: self.context("interrupt", &current, Some("program was already stopped".to_string())),
			});
		}

		let halted = session.client.halt().await;
		let mut snapshot = session.observe(halted)?;
		info!(target = "godbg.control", "halt issued");
		// The interrupted resume answers right after the halt.
		let settled = session.wait_for_stop(poll * 10, poll).await?;
		if !settled.timed_out || snapshot.is_running() {
			snapshot = settled.snapshot;
		}
		Ok(StateResponse {
			context: self.context("interrupt", &snapshot, None),
		})
	}

	/// Waits for a running target to stop, up to `timeout` or the continue bound.
	pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<StateResponse> {
		let limit = timeout.unwrap_or_else(|| self.config().continue_wait());
		let poll = self.config().poll_interval();
		let session = self.session_mut()?;

		let result = session.wait_for_stop(limit, poll).await?;
		let warning = result
			.timed_out
			.then(|| format!("program still running after {}ms", limit.as_millis()));
		Ok(StateResponse {
			context: self.context("wait", &result.snapshot, warning),
		})
	}
}
