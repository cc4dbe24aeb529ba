//! In-process stand-in for a headless Delve server.
//!
//! The simulated program is a fixed trace of source lines with call depths;
//! execution commands move a cursor through it, breakpoints stop `continue`,
//! and running past the end exits with status 0.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use godbg::DebuggerConfig;
use godbg_protocol::{
	Breakpoint, ClearBreakpointIn, ClearBreakpointOut, CommandOut, CreateBreakpointIn, CreateBreakpointOut, DebuggerCommand, DebuggerState, EvalIn,
	EvalOut, Function, Goroutine, ListBreakpointsOut, ListFunctionArgsOut, ListGoroutinesOut, ListLocalVarsOut, Location, RestartOut, StateOut, Thread,
	Variable, method,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;

pub const FILE: &str = "/src/app/main.go";
pub const PID: i64 = 4242;

#[derive(Debug, Clone, Copy)]
pub struct Frame {
	pub line: i64,
	pub function: &'static str,
	pub depth: u32,
}

const fn frame(line: i64, function: &'static str, depth: u32) -> Frame {
	Frame { line, function, depth }
}

/// `main` sums `add(total, i)` over three iterations, then prints.
pub fn summing_program() -> Vec<Frame> {
	vec![
		frame(6, "main.main", 0),
		frame(8, "main.main", 0),
		frame(13, "main.add", 1),
		frame(8, "main.main", 0),
		frame(13, "main.add", 1),
		frame(8, "main.main", 0),
		frame(13, "main.add", 1),
		frame(10, "main.main", 0),
	]
}

pub struct Program {
	trace: Vec<Frame>,
	pc: usize,
	exit: Option<i32>,
	breakpoints: Vec<Breakpoint>,
	next_id: i64,
	stopped_at: Option<i64>,
	variables: HashMap<String, Variable>,
	/// When set, `continue` never finishes on its own and only `halt` answers it.
	hold_continue: bool,
	held: Option<u64>,
	/// Requests to let pass before the next `continue` reply is sent.
	lag_next_continue: Option<usize>,
	/// A finished `continue` reply and the requests left before it goes out.
	lagging: Option<(Value, usize)>,
	/// Printed on stdout when the program exits.
	exit_output: Vec<String>,
	detached: bool,
	commands: Vec<String>,
}

impl Program {
	fn new(trace: Vec<Frame>) -> Self {
		Self {
			trace,
			pc: 0,
			exit: None,
			breakpoints: Vec::new(),
			next_id: 1,
			stopped_at: None,
			variables: sample_variables(),
			hold_continue: false,
			held: None,
			lag_next_continue: None,
			lagging: None,
			exit_output: Vec::new(),
			detached: false,
			commands: Vec::new(),
		}
	}

	fn current(&self) -> Frame {
		self.trace[self.pc]
	}

	fn state(&self) -> DebuggerState {
		let frame = self.current();
		let function = Some(Function {
			name: frame.function.to_string(),
			..Default::default()
		});
		let breakpoint = self.stopped_at.and_then(|id| self.breakpoints.iter().find(|bp| bp.id == id).cloned());
		let thread = Thread {
			id: 1,
			file: FILE.to_string(),
			line: frame.line,
			function: function.clone(),
			goroutine_id: 1,
			breakpoint,
			..Default::default()
		};
		DebuggerState {
			pid: PID,
			running: self.held.is_some(),
			current_thread: Some(thread.clone()),
			selected_goroutine: Some(Goroutine {
				id: 1,
				thread_id: 1,
				user_current_loc: Location {
					file: FILE.to_string(),
					line: frame.line,
					function,
					..Default::default()
				},
				..Default::default()
			}),
			threads: vec![thread],
			..Default::default()
		}
	}

	fn handle(&mut self, request: &Value) -> Vec<Value> {
		let lagging = self.lagging.take();
		let mut replies = self.respond(request);
		if let Some((reply, remaining)) = lagging {
			if remaining <= 1 {
				replies.push(reply);
			} else {
				self.lagging = Some((reply, remaining - 1));
			}
		}
		replies
	}

	fn respond(&mut self, request: &Value) -> Vec<Value> {
		let id = request["id"].as_u64().unwrap_or_default();
		let method = request["method"].as_str().unwrap_or_default().to_string();
		let params = request["params"][0].clone();

		if method == method::DETACH {
			self.detached = true;
			return vec![ok(id, Value::Null)];
		}
		if let Some(status) = self.exit {
			if method != method::RESTART {
				return vec![exited(id, status)];
			}
		}

		match method.as_str() {
			method::STATE => vec![ok(
				id,
				StateOut {
					state: Some(self.state()),
				},
			)],
			method::COMMAND => {
				let command: DebuggerCommand = serde_json::from_value(params).unwrap_or_default();
				self.commands.push(command.name.clone());
				self.command(id, &command.name)
			}
			method::CREATE_BREAKPOINT => {
				let input: CreateBreakpointIn = serde_json::from_value(params).unwrap_or_default();
				let line = input.breakpoint.line;
				let Some(frame) = self.trace.iter().find(|f| f.line == line) else {
					return vec![failure(id, &format!("could not find statement at {}:{line}, please use a line with a statement", input.breakpoint.file))];
				};
				let breakpoint = Breakpoint {
					id: self.next_id,
					file: input.breakpoint.file.clone(),
					line,
					function_name: frame.function.to_string(),
					..Default::default()
				};
				self.next_id += 1;
				self.breakpoints.push(breakpoint.clone());
				vec![ok(id, CreateBreakpointOut { breakpoint })]
			}
			method::LIST_BREAKPOINTS => {
				let mut breakpoints = vec![Breakpoint {
					id: -1,
					name: "unrecovered-panic".to_string(),
					function_name: "runtime.fatalpanic".to_string(),
					..Default::default()
				}];
				breakpoints.extend(self.breakpoints.iter().cloned());
				vec![ok(id, ListBreakpointsOut { breakpoints })]
			}
			method::CLEAR_BREAKPOINT => {
				let input: ClearBreakpointIn = serde_json::from_value(params).unwrap_or_default();
				match self.breakpoints.iter().position(|bp| bp.id == input.id) {
					Some(index) => {
						let breakpoint = self.breakpoints.remove(index);
						vec![ok(
							id,
							ClearBreakpointOut {
								breakpoint: Some(breakpoint),
							},
						)]
					}
					None => vec![failure(id, &format!("Breakpoint {} not found", input.id))],
				}
			}
			method::EVAL => {
				let Ok(input) = serde_json::from_value::<EvalIn>(params) else {
					return vec![failure(id, "malformed eval request")];
				};
				match self.variables.get(&input.expr) {
					Some(variable) => vec![ok(
						id,
						EvalOut {
							variable: Some(variable.clone()),
						},
					)],
					None => vec![failure(id, &format!("could not find symbol value for {}", input.expr))],
				}
			}
			method::LIST_LOCAL_VARS => {
				let mut variables: Vec<Variable> = self.variables.values().cloned().collect();
				variables.sort_by(|a, b| a.name.cmp(&b.name));
				vec![ok(id, ListLocalVarsOut { variables })]
			}
			method::LIST_FUNCTION_ARGS => vec![ok(id, ListFunctionArgsOut::default())],
			method::LIST_GOROUTINES => {
				let state = self.state();
				vec![ok(
					id,
					ListGoroutinesOut {
						goroutines: state.selected_goroutine.into_iter().collect(),
						nextg: -1,
					},
				)]
			}
			method::RESTART => {
				self.pc = 0;
				self.exit = None;
				self.stopped_at = None;
				self.held = None;
				vec![ok(id, RestartOut::default())]
			}
			other => vec![failure(id, &format!("rpc: can't find method {other}"))],
		}
	}

	fn command(&mut self, id: u64, name: &str) -> Vec<Value> {
		match name {
			"halt" => {
				let mut replies = vec![ok(id, CommandOut { state: self.settle() })];
				if let Some(held) = self.held.take() {
					replies.push(ok(held, CommandOut { state: self.state() }));
				}
				replies
			}
			"continue" if self.hold_continue => {
				self.held = Some(id);
				Vec::new()
			}
			"continue" => {
				self.stopped_at = None;
				let hit = (self.pc + 1..self.trace.len()).find(|&i| self.breakpoints.iter().any(|bp| bp.line == self.trace[i].line));
				match hit {
					Some(index) => {
						self.pc = index;
						let line = self.trace[index].line;
						if let Some(bp) = self.breakpoints.iter_mut().find(|bp| bp.line == line) {
							bp.total_hit_count += 1;
							*bp.hit_count.entry("1".to_string()).or_default() += 1;
							self.stopped_at = Some(bp.id);
						}
					}
					None => self.exit = Some(0),
				}
				let replies = self.after_move(id);
				match self.lag_next_continue.take() {
					Some(requests) => {
						self.lagging = replies.into_iter().next().map(|reply| (reply, requests));
						Vec::new()
					}
					None => replies,
				}
			}
			"next" => self.advance(id, |next, depth| next.depth <= depth),
			"step" => self.advance(id, |_, _| true),
			"stepOut" => self.advance(id, |next, depth| next.depth < depth),
			other => vec![failure(id, &format!("unknown command {other}"))],
		}
	}

	fn settle(&mut self) -> DebuggerState {
		let mut state = self.state();
		state.running = false;
		state
	}

	fn advance(&mut self, id: u64, accept: impl Fn(Frame, u32) -> bool) -> Vec<Value> {
		self.stopped_at = None;
		let depth = self.current().depth;
		match (self.pc + 1..self.trace.len()).find(|&i| accept(self.trace[i], depth)) {
			Some(index) => self.pc = index,
			None => self.exit = Some(0),
		}
		self.after_move(id)
	}

	fn after_move(&self, id: u64) -> Vec<Value> {
		match self.exit {
			Some(status) => {
				for line in &self.exit_output {
					println!("{line}");
				}
				vec![exited(id, status)]
			}
			None => vec![ok(id, CommandOut { state: self.state() })],
		}
	}
}

fn ok<T: Serialize>(id: u64, result: T) -> Value {
	json!({"id": id, "result": serde_json::to_value(result).unwrap(), "error": null})
}

fn failure(id: u64, message: &str) -> Value {
	json!({"id": id, "result": null, "error": message})
}

fn exited(id: u64, status: i32) -> Value {
	failure(id, &format!("Process {PID} has exited with status {status}"))
}

fn int(name: &str, value: &str) -> Variable {
	Variable {
		name: name.to_string(),
		type_name: "int".to_string(),
		kind: godbg_protocol::Kind::Int,
		value: value.to_string(),
		..Default::default()
	}
}

fn sample_variables() -> HashMap<String, Variable> {
	let point = Variable {
		name: "p".to_string(),
		type_name: "main.Point".to_string(),
		kind: godbg_protocol::Kind::Struct,
		addr: 0xc000012345,
		len: 2,
		children: vec![int("X", "1"), int("Y", "2")],
		..Default::default()
	};
	[("p".to_string(), point), ("total".to_string(), int("total", "3"))]
		.into_iter()
		.collect()
}

/// Handle to a running fake server.
pub struct FakeDelve {
	pub address: String,
	program: Arc<Mutex<Program>>,
	task: JoinHandle<()>,
}

impl FakeDelve {
	pub async fn start() -> Self {
		Self::with_trace(summing_program()).await
	}

	pub async fn with_trace(trace: Vec<Frame>) -> Self {
		Self::bind("127.0.0.1:0", trace).await
	}

	pub async fn bind(address: &str, trace: Vec<Frame>) -> Self {
		let listener = TcpListener::bind(address).await.unwrap();
		let address = listener.local_addr().unwrap().to_string();
		let program = Arc::new(Mutex::new(Program::new(trace)));

		let task = tokio::spawn({
			let program = Arc::clone(&program);
			async move {
				while let Ok((stream, _)) = listener.accept().await {
					let program = Arc::clone(&program);
					tokio::spawn(async move {
						let (read, write) = stream.into_split();
						serve(BufReader::new(read), write, program).await;
					});
				}
			}
		});

		Self { address, program, task }
	}

	/// Makes every later `continue` run until halted.
	pub fn hold_continue(&self) {
		self.program.lock().hold_continue = true;
	}

	/// Stops the next `continue` at once but sends its reply only after
	/// `requests` further requests have been answered.
	pub fn lag_next_continue_reply(&self, requests: usize) {
		self.program.lock().lag_next_continue = Some(requests);
	}

	/// Whether a client has sent `Detach`.
	pub fn detached(&self) -> bool {
		self.program.lock().detached
	}

	/// Execution command names received so far, in order.
	pub fn commands(&self) -> Vec<String> {
		self.program.lock().commands.clone()
	}
}

impl Drop for FakeDelve {
	fn drop(&mut self) {
		self.task.abort();
	}
}

async fn serve<R>(reader: BufReader<R>, mut write: OwnedWriteHalf, program: Arc<Mutex<Program>>)
where
	R: tokio::io::AsyncRead + Unpin,
{
	let mut lines = reader.lines();
	while let Ok(Some(line)) = lines.next_line().await {
		let Ok(request) = serde_json::from_str::<Value>(&line) else {
			continue;
		};
		let replies = program.lock().handle(&request);
		for reply in replies {
			let mut text = reply.to_string();
			text.push('\n');
			if write.write_all(text.as_bytes()).await.is_err() {
				return;
			}
		}
	}
}

/// Short waits so timeout paths finish quickly.
pub fn fast_config() -> DebuggerConfig {
	DebuggerConfig {
		connect_timeout_ms: 1_000,
		connect_interval_ms: 20,
		continue_wait_ms: 300,
		step_wait_ms: 300,
		poll_interval_ms: 20,
		eval_wait_ms: 100,
		detach_timeout_ms: 200,
		server_stop_timeout_ms: 200,
		..DebuggerConfig::default()
	}
}

pub fn millis(ms: u64) -> Duration {
	Duration::from_millis(ms)
}

/// Set on the re-executed test binary; holds the `dlv` arguments.
pub const STAND_IN_ENV: &str = "GODBG_STAND_IN_DLV_ARGS";

/// Lines the stand-in target prints when it exits.
pub const STAND_IN_OUTPUT: [&str; 2] = ["sum: 3", "done"];

/// Writes a `dlv` script into `dir` that re-runs this test binary as a
/// headless backend through the `backend_stand_in` test.
#[cfg(unix)]
pub fn stand_in_dlv(dir: &Path) -> PathBuf {
	use std::os::unix::fs::PermissionsExt;

	let exe = std::env::current_exe().unwrap();
	let script = dir.join("dlv");
	let body = format!(
		"#!/bin/sh\n{STAND_IN_ENV}=\"$*\" exec '{}' backend_stand_in --exact --nocapture --quiet --test-threads=1\n",
		exe.display()
	);
	std::fs::write(&script, body).unwrap();
	std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
	script
}

/// Serves the summing program on the `--listen` address until detached, then exits the process.
pub async fn run_stand_in(args: &str) {
	let address = args
		.split_whitespace()
		.find_map(|arg| arg.strip_prefix("--listen="))
		.expect("dlv arguments carry --listen");
	let server = FakeDelve::bind(address, summing_program()).await;
	server.program.lock().exit_output = STAND_IN_OUTPUT.iter().map(|line| line.to_string()).collect();
	println!("API server listening at: {address}");

	while !server.detached() {
		tokio::time::sleep(millis(10)).await;
	}
	// Let the detach reply reach the client.
	tokio::time::sleep(millis(50)).await;
	std::process::exit(0);
}
