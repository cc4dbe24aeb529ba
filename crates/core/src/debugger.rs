//! The orchestrator facade: at most one [`Session`] at a time.

use std::path::{Path, PathBuf};

use godbg_runtime::{BackendMode, BackendProcess, BackendSpec, ConnectOptions, connect_with_retry, locate_dlv};
use tracing::{info, warn};

use crate::compile::{self, BuiltBinary};
use crate::config::DebuggerConfig;
use crate::error::{DebugError, Result};
use crate::model::{
	CloseResponse, DebugContext, GoroutinesResponse, OutputRecordsResponse, OutputResponse, OutputStream, RestartResponse, SessionResponse,
	StateResponse,
};
use crate::output::OutputCapture;
use crate::projector::{self, Snapshot};
use crate::session::{Session, Target};

/// Drives one debugging session against a Delve backend.
///
/// Operations are expected to be issued one at a time; every method returns a
/// structured response or a [`DebugError`].
pub struct Debugger {
	config: DebuggerConfig,
	session: Option<Session>,
}

impl Debugger {
	pub fn new(config: DebuggerConfig) -> Self {
		Self { config, session: None }
	}

	pub fn config(&self) -> &DebuggerConfig {
		&self.config
	}

	pub fn is_active(&self) -> bool {
		self.session.is_some()
	}

	pub(crate) fn session_mut(&mut self) -> Result<&mut Session> {
		self.session.as_mut().ok_or(DebugError::NoActiveSession)
	}

	fn ensure_idle(&self) -> Result<()> {
		match &self.session {
			Some(session) => Err(DebugError::SessionActive {
				target: session.target.to_string(),
			}),
			None => Ok(()),
		}
	}

	fn connect_options(&self) -> ConnectOptions {
		ConnectOptions {
			timeout: self.config.connect_timeout(),
			interval: self.config.connect_interval(),
		}
	}

	/// Builds the response context from a snapshot.
	pub(crate) fn context(&self, operation: &str, snapshot: &Snapshot, warning: Option<String>) -> DebugContext {
		let mut state = projector::project(snapshot);
		state.warning = warning;
		projector::build_context(operation, state, None)
	}

	/// Context from a fresh non-blocking state query.
	pub(crate) async fn current_context(&mut self, operation: &str) -> Result<DebugContext> {
		let snapshot = self.session_mut()?.snapshot().await?;
		Ok(self.context(operation, &snapshot, None))
	}

	/// Starts `program` under a new backend, halted at entry.
	pub async fn launch(&mut self, program: &Path, args: &[String]) -> Result<SessionResponse> {
		self.ensure_idle()?;
		validate_executable(program)?;
		self.launch_program(program.to_path_buf(), args.to_vec(), None, "launch").await
	}

	/// Attaches a new backend to a running process.
	pub async fn attach(&mut self, pid: u32) -> Result<SessionResponse> {
		self.ensure_idle()?;
		if pid == 0 || !godbg_runtime::process::pid_is_alive(pid) {
			return Err(DebugError::InvalidArgument(format!("no running process with pid {pid}")));
		}

		let dlv = locate_dlv(self.config.dlv_path.as_deref()).map_err(|e| DebugError::LaunchFailed(e.to_string()))?;
		let spec = BackendSpec {
			dlv_path: dlv,
			host: self.config.listen_host.clone(),
			mode: BackendMode::Attach { pid },
			working_dir: None,
		};
		let (mut backend, stdio) = BackendProcess::spawn(&spec).map_err(|e| DebugError::LaunchFailed(e.to_string()))?;
		let backend_log = OutputCapture::start(None::<tokio::io::Empty>, stdio.stderr, self.config.live_queue_capacity);

		let address = backend.address().to_string();
		let client = match connect_with_retry(&address, Some(&mut backend), self.connect_options()).await {
			Ok(client) => client,
			Err(e) => return Err(abort_startup(e, backend, &backend_log, self.config.server_stop_timeout()).await),
		};

		let mut session = Session::new(client, Target::Process { pid }, address);
		session.backend = Some(backend);
		session.backend_log = Some(backend_log);
		self.adopt(session, "attach").await
	}

	/// Adopts an already running headless backend at `address`.
	pub async fn connect(&mut self, address: &str) -> Result<SessionResponse> {
		self.ensure_idle()?;
		if address.trim().is_empty() {
			return Err(DebugError::InvalidArgument("address must not be empty".to_string()));
		}
		let client = connect_with_retry(address, None, self.connect_options()).await?;
		let session = Session::new(
			client,
			Target::Remote {
				address: address.to_string(),
			},
			address.to_string(),
		);
		self.adopt(session, "connect").await
	}

	/// Compiles a Go source file without optimisations and launches it.
	pub async fn debug_source(&mut self, source: &Path, args: &[String]) -> Result<SessionResponse> {
		self.ensure_idle()?;
		let go = compile::locate_go(self.config.go_path.as_deref())?;
		let built = compile::build_source(&go, source).await?;
		let path = built.path.clone();
		self.launch_program(path, args.to_vec(), Some(built), "debug_source").await
	}

	/// Compiles the package test binary and launches it filtered to one test.
	pub async fn debug_test(&mut self, test_file: &Path, test_name: &str, args: &[String]) -> Result<SessionResponse> {
		self.ensure_idle()?;
		if test_name.trim().is_empty() {
			return Err(DebugError::InvalidArgument("test name must not be empty".to_string()));
		}
		let go = compile::locate_go(self.config.go_path.as_deref())?;
		let built = compile::build_test(&go, test_file).await?;
		let path = built.path.clone();
		self.launch_program(path, compile::test_run_args(test_name, args), Some(built), "debug_test").await
	}

	async fn launch_program(&mut self, program: PathBuf, args: Vec<String>, build: Option<BuiltBinary>, operation: &str) -> Result<SessionResponse> {
		let dlv = locate_dlv(self.config.dlv_path.as_deref()).map_err(|e| DebugError::LaunchFailed(e.to_string()))?;
		let spec = BackendSpec {
			dlv_path: dlv,
			host: self.config.listen_host.clone(),
			mode: BackendMode::Exec {
				program: program.clone(),
				args: args.clone(),
			},
			working_dir: program.parent().map(Path::to_path_buf),
		};
		let (mut backend, stdio) = BackendProcess::spawn(&spec).map_err(|e| DebugError::LaunchFailed(e.to_string()))?;
		let output = OutputCapture::start(stdio.stdout, stdio.stderr, self.config.live_queue_capacity);

		let address = backend.address().to_string();
		let client = match connect_with_retry(&address, Some(&mut backend), self.connect_options()).await {
			Ok(client) => client,
			Err(e) => return Err(abort_startup(e, backend, &output, self.config.server_stop_timeout()).await),
		};

		let mut session = Session::new(client, Target::Program { path: program, args }, address);
		session.backend = Some(backend);
		session.output = output;
		session.build = build;
		self.adopt(session, operation).await
	}

	/// Installs a connected session and reports its first state.
	async fn adopt(&mut self, mut session: Session, operation: &str) -> Result<SessionResponse> {
		let snapshot = match session.snapshot().await {
			Ok(snapshot) => snapshot,
			Err(e) => {
				let _ = session.teardown(self.config.detach_timeout(), self.config.server_stop_timeout()).await;
				return Err(e);
			}
		};
		let pid = match &snapshot {
			Snapshot::Live(state) if state.pid > 0 => Some(state.pid),
			_ => None,
		};

		info!(target = "godbg.session", target_name = %session.target, address = %session.address, ?pid, "session started");
		let response = SessionResponse {
			mode: session.target.mode(),
			target: session.target.to_string(),
			address: session.address.clone(),
			pid,
			context: self.context(operation, &snapshot, None),
		};
		self.session = Some(session);
		Ok(response)
	}

	/// Tears down the active session. Closing with no session is a no-op.
	///
	/// Teardown problems are logged and reported as warnings; the session is
	/// always gone afterwards.
	pub async fn close(&mut self) -> Result<CloseResponse> {
		let Some(session) = self.session.take() else {
			return Ok(CloseResponse {
				closed: false,
				message: "no active session".to_string(),
				warnings: Vec::new(),
				context: projector::closed_context("close"),
			});
		};

		let target = session.target.to_string();
		let warnings = session.teardown(self.config.detach_timeout(), self.config.server_stop_timeout()).await;
		if warnings.is_empty() {
			info!(target = "godbg.session", target_name = %target, "session closed");
		} else {
			warn!(target = "godbg.session", target_name = %target, warnings = warnings.len(), "session closed with warnings");
		}

		Ok(CloseResponse {
			closed: true,
			message: format!("closed session for {target}"),
			warnings,
			context: projector::closed_context("close"),
		})
	}

	/// Explicit state query, including per-thread locations.
	pub async fn state(&mut self) -> Result<StateResponse> {
		let snapshot = self.session_mut()?.snapshot().await?;
		let mut state = projector::project(&snapshot);
		state.warning = None;
		let threads = projector::thread_summaries(&snapshot);
		Ok(StateResponse {
			context: projector::build_context("state", state, Some(threads)),
		})
	}

	/// Lists goroutines, capped by `goroutine_limit`.
	pub async fn goroutines(&mut self) -> Result<GoroutinesResponse> {
		let limit = self.config.goroutine_limit;
		let session = self.session_mut()?;
		session.ensure_alive()?;
		let mut snapshot = session.snapshot().await?;
		let selected = match &snapshot {
			Snapshot::Live(state) => state.selected_goroutine.as_ref().map(|g| g.id),
			Snapshot::Exited { .. } => None,
		};
		let goroutines = match session.client.list_goroutines(limit).await {
			Ok(list) => list,
			Err(e) if e.is_process_exited() => {
				snapshot = session.observe(Err(e))?;
				Vec::new()
			}
			Err(e) => return Err(e.into()),
		};
		Ok(GoroutinesResponse {
			goroutines: goroutines.iter().map(|g| projector::goroutine_summary(g, selected)).collect(),
			context: self.context("goroutines", &snapshot, None),
		})
	}

	/// Restarts a launched program from the beginning, keeping breakpoints.
	pub async fn restart(&mut self) -> Result<RestartResponse> {
		let session = self.session_mut()?;
		if !matches!(session.target, Target::Program { .. }) {
			return Err(DebugError::InvalidArgument("restart is only supported for launched programs".to_string()));
		}
		session.resume = None;
		let out = session.client.restart().await?;
		session.exit_code = None;
		let discarded = out
			.discarded_breakpoints
			.iter()
			.map(|d| match &d.breakpoint {
				Some(bp) => format!("breakpoint {} at {}:{}: {}", bp.id, bp.file, bp.line, d.reason),
				None => d.reason.clone(),
			})
			.collect::<Vec<_>>();
		info!(target = "godbg.session", discarded = discarded.len(), "target restarted");

		let snapshot = session.snapshot().await?;
		Ok(RestartResponse {
			discarded_breakpoints: discarded,
			context: self.context("restart", &snapshot, None),
		})
	}

	/// Full captured stdout and stderr, independent of live-queue consumption.
	pub async fn get_output(&mut self) -> Result<OutputResponse> {
		let session = self.session_mut()?;
		let stdout = session.output.text(OutputStream::Stdout);
		let stderr = session.output.text(OutputStream::Stderr);
		Ok(OutputResponse {
			stdout,
			stderr,
			context: self.current_context("get_output").await?,
		})
	}

	/// Oldest undelivered live record, if any.
	pub async fn peek_output(&mut self) -> Result<OutputRecordsResponse> {
		let record = self.session_mut()?.output.peek_next();
		Ok(OutputRecordsResponse {
			records: record.into_iter().collect(),
			context: self.current_context("peek_output").await?,
		})
	}

	/// All queued live records, up to `drain_limit`.
	pub async fn drain_output(&mut self) -> Result<OutputRecordsResponse> {
		let limit = self.config.drain_limit;
		let records = self.session_mut()?.output.drain_available(limit);
		Ok(OutputRecordsResponse {
			records,
			context: self.current_context("drain_output").await?,
		})
	}
}

/// Launch mode requires an existing, absolute, executable file.
fn validate_executable(program: &Path) -> Result<()> {
	if !program.is_absolute() {
		return Err(DebugError::InvalidArgument(format!("program path must be absolute: {}", program.display())));
	}
	let metadata = std::fs::metadata(program).map_err(|e| DebugError::InvalidArgument(format!("{}: {e}", program.display())))?;
	if !metadata.is_file() {
		return Err(DebugError::InvalidArgument(format!("{} is not a file", program.display())));
	}
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		if metadata.permissions().mode() & 0o111 == 0 {
			return Err(DebugError::InvalidArgument(format!("{} is not executable", program.display())));
		}
	}
	Ok(())
}

/// Cleans up a backend that never became reachable and builds the failure.
async fn abort_startup(err: godbg_runtime::Error, mut backend: BackendProcess, log: &OutputCapture, grace: std::time::Duration) -> DebugError {
	let exited_early = matches!(err, godbg_runtime::Error::BackendExited { .. });
	if !exited_early {
		backend.stop(grace.min(std::time::Duration::from_millis(500))).await;
	}
	// Give the stderr reader a moment to pick up the final message.
	tokio::time::sleep(std::time::Duration::from_millis(50)).await;
	let stderr = log.text(OutputStream::Stderr);
	let detail = stderr.trim();

	match err {
		godbg_runtime::Error::ConnectTimeout { address, timeout_ms } => DebugError::ConnectTimeout { address, timeout_ms },
		other if detail.is_empty() => DebugError::LaunchFailed(other.to_string()),
		other => DebugError::LaunchFailed(format!("{other}: {detail}")),
	}
}
