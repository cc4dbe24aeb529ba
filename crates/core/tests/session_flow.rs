mod support;

use godbg::{Debugger, ExecutionStatus, SessionMode, VariableKind};
use support::{FILE, FakeDelve, fast_config, millis};

async fn connected(server: &FakeDelve) -> Debugger {
	let mut dbg = Debugger::new(fast_config());
	let response = dbg.connect(&server.address).await.unwrap();
	assert_eq!(response.mode, SessionMode::Connect);
	assert_eq!(response.pid, Some(support::PID));
	assert_eq!(response.context.state.status, ExecutionStatus::Stopped);
	dbg
}

#[tokio::test]
async fn breakpoint_hit_repeatedly_then_program_exits() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let set = dbg.set_breakpoint(FILE, 13).await.unwrap();
	assert_eq!(set.breakpoint.id, 1);
	assert_eq!(set.breakpoint.location.function, "main.add");
	assert!(set.breakpoint.enabled);
	assert!(!set.breakpoint.hit);

	for round in 1..=3u64 {
		let state = dbg.continue_execution().await.unwrap().context.state;
		assert_eq!(state.status, ExecutionStatus::Stopped, "round {round}");
		assert_eq!(state.location.as_ref().unwrap().line, 13);
		assert_eq!(state.reason, "hit breakpoint 1");

		let listed = dbg.list_breakpoints().await.unwrap();
		assert_eq!(listed.breakpoints.len(), 1);
		assert_eq!(listed.breakpoints[0].hit_count, round);
	}

	let done = dbg.continue_execution().await.unwrap().context;
	assert_eq!(done.state.status, ExecutionStatus::Exited);
	assert_eq!(done.state.exit_code, Some(0));
	assert_eq!(done.next_actions, vec!["restart", "close"]);

	let err = dbg.continue_execution().await.unwrap_err();
	assert_eq!(err.code(), "PROCESS_EXITED");
	let err = dbg.step().await.unwrap_err();
	assert_eq!(err.code(), "PROCESS_EXITED");

	dbg.close().await.unwrap();
}

#[tokio::test]
async fn step_over_stays_in_frame_while_step_enters_call() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let first = dbg.step_over().await.unwrap().context.state;
	assert_eq!(first.location.as_ref().unwrap().line, 8);

	let over = dbg.step_over().await.unwrap().context.state;
	assert_eq!(over.location.as_ref().unwrap().line, 8);
	assert_eq!(over.location.as_ref().unwrap().function, "main.main");

	let into = dbg.step().await.unwrap().context.state;
	assert_eq!(into.location.as_ref().unwrap().line, 13);
	assert_eq!(into.location.as_ref().unwrap().function, "main.add");

	let out = dbg.step_out().await.unwrap().context.state;
	assert_eq!(out.location.as_ref().unwrap().function, "main.main");

	assert_eq!(server.commands(), vec!["next", "next", "step", "stepOut"]);
}

#[tokio::test]
async fn evaluation_depth_controls_children() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let shallow = dbg.evaluate("p", Some(0)).await.unwrap().variable;
	assert_eq!(shallow.kind, VariableKind::Struct);
	assert!(shallow.children.is_empty());

	let deep = dbg.evaluate("p", Some(1)).await.unwrap().variable;
	assert_eq!(deep.children.len(), 2);
	assert_eq!(deep.children[0].expression, "p.X");
	assert_eq!(deep.children[0].value, "1");

	let scope = dbg.list_scope(None).await.unwrap();
	let names: Vec<_> = scope.locals.iter().map(|v| v.name.as_str()).collect();
	assert_eq!(names, vec!["p", "total"]);
	assert!(scope.arguments.is_empty());
}

#[tokio::test]
async fn unknown_identifier_is_an_eval_failure() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let err = dbg.evaluate("missing", None).await.unwrap_err();
	assert_eq!(err.code(), "EVAL_FAILED");
	assert!(err.to_string().contains("could not find symbol"));
	assert!(dbg.is_active());
}

#[tokio::test]
async fn removing_unknown_breakpoint_fails() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	assert_eq!(dbg.remove_breakpoint(7).await.unwrap_err().code(), "BREAKPOINT_NOT_FOUND");

	let set = dbg.set_breakpoint(FILE, 8).await.unwrap();
	let removed = dbg.remove_breakpoint(set.breakpoint.id).await.unwrap();
	assert_eq!(removed.breakpoint.location.line, 8);
	assert!(dbg.list_breakpoints().await.unwrap().breakpoints.is_empty());
	assert_eq!(dbg.remove_breakpoint(set.breakpoint.id).await.unwrap_err().code(), "BREAKPOINT_NOT_FOUND");
}

#[tokio::test]
async fn breakpoint_on_line_without_code_is_a_backend_error() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let err = dbg.set_breakpoint(FILE, 99).await.unwrap_err();
	assert_eq!(err.code(), "BACKEND_ERROR");
	assert_eq!(dbg.set_breakpoint(FILE, 0).await.unwrap_err().code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn close_is_idempotent() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let first = dbg.close().await.unwrap();
	assert!(first.closed);
	assert!(first.warnings.is_empty());
	assert_eq!(first.context.state.status, ExecutionStatus::Exited);

	let second = dbg.close().await.unwrap();
	assert!(!second.closed);
	assert_eq!(dbg.state().await.unwrap_err().code(), "NO_ACTIVE_SESSION");
}

#[tokio::test]
async fn second_session_is_rejected_while_one_is_active() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;
	assert_eq!(dbg.connect(&server.address).await.unwrap_err().code(), "SESSION_ACTIVE");
}

#[tokio::test]
async fn long_running_continue_warns_and_can_be_interrupted() {
	let server = FakeDelve::start().await;
	server.hold_continue();
	let mut dbg = connected(&server).await;

	let running = dbg.continue_execution().await.unwrap().context;
	assert_eq!(running.state.status, ExecutionStatus::Running);
	assert!(running.state.warning.as_deref().unwrap().contains("still running"));
	assert_eq!(running.next_actions, vec!["wait", "interrupt"]);

	// Operations that need a stopped target refuse rather than block.
	assert_eq!(dbg.evaluate("p", None).await.unwrap_err().code(), "PROGRAM_RUNNING");

	// A second continue keeps waiting on the first.
	let again = dbg.continue_execution().await.unwrap().context;
	assert_eq!(again.state.status, ExecutionStatus::Running);
	assert_eq!(server.commands(), vec!["continue"]);

	let waited = dbg.wait(Some(millis(50))).await.unwrap().context;
	assert!(waited.state.warning.is_some());

	let stopped = dbg.interrupt().await.unwrap().context;
	assert_eq!(stopped.state.status, ExecutionStatus::Stopped);
	assert!(stopped.state.warning.is_none());

	let idle = dbg.interrupt().await.unwrap().context;
	assert_eq!(idle.state.warning.as_deref(), Some("program was already stopped"));
}

#[tokio::test]
async fn continue_after_a_stop_whose_reply_lagged_resumes_again() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;
	dbg.set_breakpoint(FILE, 13).await.unwrap();

	server.lag_next_continue_reply(2);
	let first = dbg.continue_execution().await.unwrap().context.state;
	assert_eq!(first.status, ExecutionStatus::Stopped);
	assert_eq!(first.location.as_ref().unwrap().line, 13);

	let second = dbg.continue_execution().await.unwrap().context.state;
	assert_eq!(second.status, ExecutionStatus::Stopped);
	assert_eq!(server.commands(), vec!["continue", "continue"]);

	let listed = dbg.list_breakpoints().await.unwrap();
	assert_eq!(listed.breakpoints[0].hit_count, 2);
}

#[tokio::test]
async fn restart_is_limited_to_launched_programs() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;
	assert_eq!(dbg.restart().await.unwrap_err().code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn goroutines_and_state_report_the_selected_thread() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let goroutines = dbg.goroutines().await.unwrap();
	assert_eq!(goroutines.goroutines.len(), 1);
	assert!(goroutines.goroutines[0].current);

	let state = dbg.state().await.unwrap().context;
	let threads = state.threads.unwrap();
	assert_eq!(threads.len(), 1);
	assert!(threads[0].current);
	assert_eq!(threads[0].goroutine_id, Some(1));
}

#[tokio::test]
async fn connected_session_has_no_captured_output() {
	let server = FakeDelve::start().await;
	let mut dbg = connected(&server).await;

	let output = dbg.get_output().await.unwrap();
	assert!(output.stdout.is_empty());
	assert!(output.stderr.is_empty());
	assert!(dbg.drain_output().await.unwrap().records.is_empty());
	assert!(dbg.peek_output().await.unwrap().records.is_empty());
}

#[tokio::test]
async fn connect_to_closed_port_times_out() {
	let mut config = fast_config();
	config.connect_timeout_ms = 150;
	let mut dbg = Debugger::new(config);
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let address = listener.local_addr().unwrap().to_string();
	drop(listener);

	let err = dbg.connect(&address).await.unwrap_err();
	assert_eq!(err.code(), "CONNECT_TIMEOUT");
	assert!(!dbg.is_active());
}

/// Runs this binary as the `dlv` process when started by [`support::stand_in_dlv`].
#[tokio::test]
async fn backend_stand_in() {
	let Ok(args) = std::env::var(support::STAND_IN_ENV) else {
		return;
	};
	support::run_stand_in(&args).await;
}

#[cfg(unix)]
#[tokio::test]
async fn launched_program_runs_to_exit_and_keeps_its_output() {
	let dir = tempfile::tempdir().unwrap();
	let config = godbg::DebuggerConfig {
		dlv_path: Some(support::stand_in_dlv(dir.path())),
		connect_timeout_ms: 10_000,
		server_stop_timeout_ms: 5_000,
		..fast_config()
	};
	let program = std::env::current_exe().unwrap();
	let mut dbg = Debugger::new(config);

	let launched = dbg.launch(&program, &[]).await.unwrap();
	assert_eq!(launched.mode, SessionMode::Launch);
	assert_eq!(launched.pid, Some(support::PID));
	assert_eq!(launched.context.state.location.as_ref().unwrap().line, 6);

	let done = dbg.continue_execution().await.unwrap().context.state;
	assert_eq!(done.status, ExecutionStatus::Exited);
	assert_eq!(done.exit_code, Some(0));

	dbg.drain_output().await.unwrap();
	let mut stdout = String::new();
	for _ in 0..100 {
		stdout = dbg.get_output().await.unwrap().stdout;
		if stdout.contains("done") {
			break;
		}
		tokio::time::sleep(millis(20)).await;
	}
	for line in support::STAND_IN_OUTPUT {
		assert!(stdout.contains(line), "stdout: {stdout:?}");
	}
	assert!(!stdout.contains("API server listening"), "stdout: {stdout:?}");

	let closed = dbg.close().await.unwrap();
	assert!(closed.closed);
	assert!(closed.warnings.is_empty(), "warnings: {:?}", closed.warnings);
	assert!(!dbg.close().await.unwrap().closed);
}
