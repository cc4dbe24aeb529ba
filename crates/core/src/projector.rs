//! Pure projection from backend snapshots to [`ExecutionState`] and [`DebugContext`].
//!
//! Nothing here talks to the backend or mutates the session; the same snapshot
//! always yields the same projection (apart from the context timestamp).

use godbg_protocol::{DebuggerState, Goroutine, Thread};

use crate::model::{DebugContext, ExecutionState, ExecutionStatus, GoroutineSummary, SourceLocation, ThreadSummary, now_ms};

/// Raw backend observation, validated before projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
	Live(Box<DebuggerState>),
	/// The backend answered with "process has exited" instead of a state.
	Exited { status: i32 },
}

impl Snapshot {
	pub fn live(state: DebuggerState) -> Self {
		if state.exited {
			Snapshot::Exited { status: state.exit_status }
		} else {
			Snapshot::Live(Box::new(state))
		}
	}

	pub fn is_running(&self) -> bool {
		matches!(self, Snapshot::Live(state) if state.running)
	}

	pub fn exit_code(&self) -> Option<i32> {
		match self {
			Snapshot::Exited { status } => Some(*status),
			Snapshot::Live(_) => None,
		}
	}
}

/// Priority: exited, then running, then stepping, then stopped.
pub fn derive_status(state: &DebuggerState) -> ExecutionStatus {
	if state.exited {
		ExecutionStatus::Exited
	} else if state.running {
		ExecutionStatus::Running
	} else if state.next_in_progress {
		ExecutionStatus::Stepping
	} else {
		ExecutionStatus::Stopped
	}
}

pub fn project(snapshot: &Snapshot) -> ExecutionState {
	match snapshot {
		Snapshot::Exited { status } => exited_state(*status),
		Snapshot::Live(state) => project_live(state),
	}
}

fn project_live(state: &DebuggerState) -> ExecutionState {
	let status = derive_status(state);
	if status == ExecutionStatus::Exited {
		return exited_state(state.exit_status);
	}

	let thread = state.current_thread.as_ref();
	let goroutine_id = state
		.selected_goroutine
		.as_ref()
		.map(|g| g.id)
		.or_else(|| thread.map(|t| t.goroutine_id))
		.filter(|id| *id > 0);

	let location = if status == ExecutionStatus::Running {
		None
	} else {
		thread
			.and_then(thread_location)
			.or_else(|| state.selected_goroutine.as_ref().and_then(goroutine_location))
	};

	ExecutionState {
		status,
		thread_id: thread.map(|t| t.id).filter(|id| *id > 0),
		goroutine_id,
		location,
		exit_code: None,
		reason: stop_reason(state, status),
		warning: None,
	}
}

pub fn exited_state(exit_code: i32) -> ExecutionState {
	ExecutionState {
		status: ExecutionStatus::Exited,
		thread_id: None,
		goroutine_id: None,
		location: None,
		exit_code: Some(exit_code),
		reason: format!("process exited with status {exit_code}"),
		warning: None,
	}
}

/// Natural-language reason for the current state.
pub fn stop_reason(state: &DebuggerState, status: ExecutionStatus) -> String {
	match status {
		ExecutionStatus::Exited => format!("process exited with status {}", state.exit_status),
		ExecutionStatus::Running => "process running".to_string(),
		ExecutionStatus::Stepping => "step in progress; another breakpoint interrupted it".to_string(),
		ExecutionStatus::Stopped => {
			let hit = state.current_thread.as_ref().and_then(|t| t.breakpoint.as_ref());
			match hit {
				Some(bp) if bp.id > 0 => format!("hit breakpoint {}", bp.id),
				Some(bp) if bp.name == "unrecovered-panic" => "unrecovered panic".to_string(),
				Some(bp) if bp.name == "fatal-throw" => "fatal runtime error".to_string(),
				_ => "process stopped".to_string(),
			}
		}
	}
}

/// Suggested follow-up operations for `status`.
pub fn next_actions(status: ExecutionStatus) -> Vec<String> {
	let actions: &[&str] = match status {
		ExecutionStatus::Exited => &["restart", "close"],
		ExecutionStatus::Running => &["wait", "interrupt"],
		ExecutionStatus::Stepping => &["continue", "wait", "interrupt"],
		ExecutionStatus::Stopped => &["continue", "step_over", "step", "step_out", "set_breakpoint", "evaluate", "list_scope"],
	};
	actions.iter().map(|a| a.to_string()).collect()
}

pub fn summarize(state: &ExecutionState) -> String {
	let at = state
		.location
		.as_ref()
		.map(|loc| {
			if loc.function.is_empty() {
				format!(" at {}", loc.short())
			} else {
				format!(" at {} in {}", loc.short(), loc.function)
			}
		})
		.unwrap_or_default();

	let mut summary = match state.status {
		ExecutionStatus::Exited => format!("Program exited with code {}", state.exit_code.unwrap_or_default()),
		ExecutionStatus::Running => "Program is running".to_string(),
		ExecutionStatus::Stepping => format!("Step in progress{at}"),
		ExecutionStatus::Stopped => format!("Stopped{at} ({})", state.reason),
	};
	if let Some(warning) = &state.warning {
		summary.push_str("; ");
		summary.push_str(warning);
	}
	summary
}

pub fn build_context(operation: &str, state: ExecutionState, threads: Option<Vec<ThreadSummary>>) -> DebugContext {
	DebugContext {
		summary: summarize(&state),
		next_actions: next_actions(state.status),
		last_operation: operation.to_string(),
		threads,
		timestamp: now_ms(),
		state,
	}
}

/// Context reported once no session exists anymore.
pub fn closed_context(operation: &str) -> DebugContext {
	DebugContext {
		state: ExecutionState {
			status: ExecutionStatus::Exited,
			thread_id: None,
			goroutine_id: None,
			location: None,
			exit_code: None,
			reason: "session closed".to_string(),
			warning: None,
		},
		last_operation: operation.to_string(),
		summary: "No active session".to_string(),
		next_actions: ["launch", "attach", "debug_source", "debug_test", "connect"].iter().map(|a| a.to_string()).collect(),
		threads: None,
		timestamp: now_ms(),
	}
}

pub fn thread_summaries(snapshot: &Snapshot) -> Vec<ThreadSummary> {
	let Snapshot::Live(state) = snapshot else {
		return Vec::new();
	};
	let current = state.current_thread.as_ref().map(|t| t.id);
	state
		.threads
		.iter()
		.map(|t| ThreadSummary {
			id: t.id,
			goroutine_id: Some(t.goroutine_id).filter(|id| *id > 0),
			location: thread_location(t),
			current: Some(t.id) == current,
		})
		.collect()
}

pub fn goroutine_summary(goroutine: &Goroutine, selected: Option<i64>) -> GoroutineSummary {
	GoroutineSummary {
		id: goroutine.id,
		thread_id: Some(goroutine.thread_id).filter(|id| *id > 0),
		location: goroutine_location(goroutine),
		current: Some(goroutine.id) == selected,
	}
}

fn thread_location(thread: &Thread) -> Option<SourceLocation> {
	if thread.file.is_empty() {
		return None;
	}
	let function = thread.function.as_ref().map(|f| f.name.clone()).unwrap_or_default();
	Some(SourceLocation {
		file: thread.file.clone(),
		line: thread.line,
		package: package_of(&function),
		function,
	})
}

fn goroutine_location(goroutine: &Goroutine) -> Option<SourceLocation> {
	let loc = &goroutine.user_current_loc;
	if loc.file.is_empty() {
		return None;
	}
	let function = loc.function.as_ref().map(|f| f.name.clone()).unwrap_or_default();
	Some(SourceLocation {
		file: loc.file.clone(),
		line: loc.line,
		package: package_of(&function),
		function,
	})
}

/// Package path of a fully qualified Go symbol.
///
/// `github.com/acme/app/store.(*DB).Get` yields `github.com/acme/app/store`.
pub fn package_of(function: &str) -> String {
	let slash = function.rfind('/').map(|i| i + 1).unwrap_or(0);
	match function[slash..].find('.') {
		Some(dot) => function[..slash + dot].to_string(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use godbg_protocol::{Breakpoint, Function};

	fn stopped_at(line: i64, bp_id: Option<i64>) -> DebuggerState {
		DebuggerState {
			current_thread: Some(Thread {
				id: 7,
				file: "/src/main.go".into(),
				line,
				goroutine_id: 1,
				function: Some(Function {
					name: "main.main".into(),
					..Default::default()
				}),
				breakpoint: bp_id.map(|id| Breakpoint {
					id,
					..Default::default()
				}),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn status_priority_prefers_exited_then_running() {
		let mut state = DebuggerState {
			exited: true,
			running: true,
			next_in_progress: true,
			..Default::default()
		};
		assert_eq!(derive_status(&state), ExecutionStatus::Exited);
		state.exited = false;
		assert_eq!(derive_status(&state), ExecutionStatus::Running);
		state.running = false;
		assert_eq!(derive_status(&state), ExecutionStatus::Stepping);
		state.next_in_progress = false;
		assert_eq!(derive_status(&state), ExecutionStatus::Stopped);
	}

	#[test]
	fn breakpoint_hit_is_projected() {
		let projected = project(&Snapshot::live(stopped_at(10, Some(1))));
		assert_eq!(projected.status, ExecutionStatus::Stopped);
		assert_eq!(projected.reason, "hit breakpoint 1");
		assert_eq!(projected.thread_id, Some(7));
		assert_eq!(projected.goroutine_id, Some(1));
		let location = projected.location.unwrap();
		assert_eq!(location.line, 10);
		assert_eq!(location.package, "main");
	}

	#[test]
	fn stop_without_breakpoint_is_plain_stop() {
		let projected = project(&Snapshot::live(stopped_at(3, None)));
		assert_eq!(projected.reason, "process stopped");
	}

	#[test]
	fn running_state_has_no_location() {
		let mut state = stopped_at(10, None);
		state.running = true;
		let projected = project(&Snapshot::live(state));
		assert_eq!(projected.status, ExecutionStatus::Running);
		assert!(projected.location.is_none());
		assert_eq!(projected.reason, "process running");
	}

	#[test]
	fn exited_flag_becomes_exit_snapshot() {
		let snapshot = Snapshot::live(DebuggerState {
			exited: true,
			exit_status: 4,
			..Default::default()
		});
		assert_eq!(snapshot, Snapshot::Exited { status: 4 });
		let projected = project(&snapshot);
		assert_eq!(projected.exit_code, Some(4));
		assert_eq!(projected.status, ExecutionStatus::Exited);
	}

	#[test]
	fn projection_is_deterministic() {
		let snapshot = Snapshot::live(stopped_at(12, Some(2)));
		assert_eq!(project(&snapshot), project(&snapshot));
	}

	#[test]
	fn next_actions_follow_status() {
		assert_eq!(next_actions(ExecutionStatus::Exited), vec!["restart", "close"]);
		assert_eq!(next_actions(ExecutionStatus::Running), vec!["wait", "interrupt"]);
		assert!(next_actions(ExecutionStatus::Stopped).contains(&"continue".to_string()));
	}

	#[test]
	fn package_paths() {
		assert_eq!(package_of("main.main"), "main");
		assert_eq!(package_of("github.com/acme/app/store.(*DB).Get"), "github.com/acme/app/store");
		assert_eq!(package_of("runtime.goexit"), "runtime");
		assert_eq!(package_of("nodot"), "");
	}

	#[test]
	fn summary_mentions_location_and_warning() {
		let mut state = project(&Snapshot::live(stopped_at(10, Some(1))));
		state.warning = Some("wait timed out".into());
		let summary = summarize(&state);
		assert!(summary.starts_with("Stopped at main.go:10 in main.main"));
		assert!(summary.ends_with("wait timed out"));
	}
}
