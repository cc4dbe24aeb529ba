//! Typed client over the Delve `RPCServer` API.

use std::sync::Arc;
use std::time::Duration;

use godbg_protocol::{
	Breakpoint, ClearBreakpointIn, ClearBreakpointOut, CommandOut, CreateBreakpointIn, CreateBreakpointOut, DebuggerCommand, DebuggerState,
	DetachIn, EvalIn, EvalOut, EvalScope, Goroutine, ListBreakpointsIn, ListBreakpointsOut, ListFunctionArgsOut, ListGoroutinesIn,
	ListGoroutinesOut, ListLocalVarsOut, LoadConfig, RestartIn, RestartOut, ScopeVarsIn, StateIn, StateOut, Variable, command_name, method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::connection::{Connection, PendingCall};
use crate::error::{Error, Result, parse_process_exited};

/// Handle to a connected Delve server.
///
/// Cloning is cheap; every clone shares the same underlying connection.
#[derive(Clone)]
pub struct DelveClient {
	connection: Arc<Connection>,
}

/// An execution command whose resulting state has not arrived yet.
pub struct PendingState {
	call: PendingCall,
}

impl PendingState {
	/// Waits at most `limit` for the backend to report the new state.
	///
	/// `None` means the target is still executing the command.
	pub async fn wait_timeout(&mut self, limit: Duration) -> Option<Result<DebuggerState>> {
		let method = self.call.method().to_string();
		let result = self.call.wait_timeout(limit).await?;
		Some(result.map_err(classify).and_then(|value| decode::<CommandOut>(&method, value)).map(|out| out.state))
	}
}

impl DelveClient {
	pub fn new(connection: Arc<Connection>) -> Self {
		Self { connection }
	}

	pub fn is_closed(&self) -> bool {
		self.connection.is_closed()
	}

	/// Drops the connection without talking to the backend.
	pub fn shutdown(&self) {
		self.connection.shutdown();
	}

	async fn invoke<P, T>(&self, method: &str, params: P) -> Result<T>
	where
		P: serde::Serialize,
		T: DeserializeOwned,
	{
		let value = self.connection.call(method, params).await.map_err(classify)?;
		decode(method, value)
	}

	/// Current state; with `non_blocking` the backend answers even while the target runs.
	pub async fn state(&self, non_blocking: bool) -> Result<DebuggerState> {
		let out: StateOut = self.invoke(method::STATE, StateIn { non_blocking }).await?;
		out.state
			.ok_or_else(|| Error::ProtocolError("RPCServer.State returned no state".to_string()))
	}

	/// Issues an execution command and awaits the resulting state.
	pub async fn command(&self, command: DebuggerCommand) -> Result<DebuggerState> {
		let out: CommandOut = self.invoke(method::COMMAND, command).await?;
		Ok(out.state)
	}

	/// Issues an execution command without waiting for it to finish.
	pub async fn start_command(&self, command: DebuggerCommand) -> Result<PendingState> {
		let call = self.connection.start_call(method::COMMAND, command).await?;
		Ok(PendingState { call })
	}

	/// Asks a running target to stop.
	pub async fn halt(&self) -> Result<DebuggerState> {
		self.command(DebuggerCommand::named(command_name::HALT)).await
	}

	pub async fn create_breakpoint(&self, file: &str, line: i64) -> Result<Breakpoint> {
		let input = CreateBreakpointIn {
			breakpoint: Breakpoint {
				file: file.to_string(),
				line,
				..Default::default()
			},
		};
		let out: CreateBreakpointOut = self.invoke(method::CREATE_BREAKPOINT, input).await?;
		Ok(out.breakpoint)
	}

	pub async fn list_breakpoints(&self) -> Result<Vec<Breakpoint>> {
		let out: ListBreakpointsOut = self.invoke(method::LIST_BREAKPOINTS, ListBreakpointsIn { all: false }).await?;
		Ok(out.breakpoints)
	}

	pub async fn clear_breakpoint(&self, id: i64) -> Result<Option<Breakpoint>> {
		let out: ClearBreakpointOut = self
			.invoke(method::CLEAR_BREAKPOINT, ClearBreakpointIn { id, name: String::new() })
			.await?;
		Ok(out.breakpoint)
	}

	pub async fn eval(&self, scope: EvalScope, expr: &str, cfg: LoadConfig) -> Result<Variable> {
		let input = EvalIn {
			scope,
			expr: expr.to_string(),
			cfg: Some(cfg),
		};
		let out: EvalOut = self.invoke(method::EVAL, input).await?;
		out.variable
			.ok_or_else(|| Error::ProtocolError(format!("RPCServer.Eval returned no variable for {expr}")))
	}

	pub async fn list_local_vars(&self, scope: EvalScope, cfg: LoadConfig) -> Result<Vec<Variable>> {
		let out: ListLocalVarsOut = self.invoke(method::LIST_LOCAL_VARS, ScopeVarsIn { scope, cfg }).await?;
		Ok(out.variables)
	}

	pub async fn list_function_args(&self, scope: EvalScope, cfg: LoadConfig) -> Result<Vec<Variable>> {
		let out: ListFunctionArgsOut = self.invoke(method::LIST_FUNCTION_ARGS, ScopeVarsIn { scope, cfg }).await?;
		Ok(out.args)
	}

	pub async fn list_goroutines(&self, count: i64) -> Result<Vec<Goroutine>> {
		let out: ListGoroutinesOut = self.invoke(method::LIST_GOROUTINES, ListGoroutinesIn { start: 0, count }).await?;
		Ok(out.goroutines)
	}

	/// Restarts the target from the beginning, keeping breakpoints.
	pub async fn restart(&self) -> Result<RestartOut> {
		self.invoke(method::RESTART, RestartIn::default()).await
	}

	/// Detaches from the target; the headless server shuts down afterwards.
	pub async fn detach(&self, kill: bool) -> Result<()> {
		let _: Value = self.invoke(method::DETACH, DetachIn { kill }).await?;
		Ok(())
	}
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
	let value = if value.is_null() { Value::Object(Default::default()) } else { value };
	serde_json::from_value(value).map_err(|e| Error::ProtocolError(format!("invalid {method} response: {e}")))
}

/// Lifts Delve's "process has exited" message into a typed error.
fn classify(err: Error) -> Error {
	match err {
		Error::Rpc { method, message } => match parse_process_exited(&message) {
			Some((pid, status)) => Error::ProcessExited { pid, status },
			None => Error::Rpc { method, message },
		},
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake_transport::{FakeTransportBuilder, FakeTransportController};

	fn client() -> (DelveClient, FakeTransportController) {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let connection = Arc::new(Connection::new(parts));
		let conn = Arc::clone(&connection);
		tokio::spawn(async move { conn.run().await });
		(DelveClient::new(connection), controller)
	}

	#[tokio::test]
	async fn state_decodes_snapshot() {
		let (client, controller) = client();
		let task = tokio::spawn({
			let client = client.clone();
			async move { client.state(true).await }
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		controller.inject_response(0, serde_json::json!({"State": {"Running": true, "Pid": 9}}));

		let state = task.await.unwrap().unwrap();
		assert!(state.running);
		assert_eq!(state.pid, 9);

		let sent = controller.take_sent().await;
		assert_eq!(sent[0]["method"], "RPCServer.State");
		assert_eq!(sent[0]["params"][0]["NonBlocking"], true);
	}

	#[tokio::test]
	async fn exited_process_error_is_typed() {
		let (client, controller) = client();
		let task = tokio::spawn({
			let client = client.clone();
			async move { client.state(false).await }
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		controller.inject_error(0, "Process 1234 has exited with status 3");

		let err = task.await.unwrap().unwrap_err();
		assert!(err.is_process_exited());
		assert_eq!(err.exit_status(), Some(3));
	}

	#[tokio::test]
	async fn pending_command_reports_state_when_it_arrives() {
		let (client, controller) = client();
		let mut pending = client.start_command(DebuggerCommand::named(command_name::CONTINUE)).await.unwrap();
		assert!(pending.wait_timeout(Duration::from_millis(20)).await.is_none());

		controller.inject_response(0, serde_json::json!({"State": {"exited": true, "exitStatus": 0}}));
		let state = pending.wait_timeout(Duration::from_secs(1)).await.unwrap().unwrap();
		assert!(state.exited);

		let sent = controller.take_sent().await;
		assert_eq!(sent[0]["params"][0]["name"], "continue");
	}

	#[tokio::test]
	async fn create_breakpoint_sends_location() {
		let (client, controller) = client();
		let task = tokio::spawn({
			let client = client.clone();
			async move { client.create_breakpoint("/src/main.go", 10).await }
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		controller.inject_response(0, serde_json::json!({"Breakpoint": {"id": 1, "file": "/src/main.go", "line": 10}}));

		let bp = task.await.unwrap().unwrap();
		assert_eq!(bp.id, 1);

		let sent = controller.take_sent().await;
		assert_eq!(sent[0]["params"][0]["Breakpoint"]["file"], "/src/main.go");
		assert_eq!(sent[0]["params"][0]["Breakpoint"]["line"], 10);
	}

	#[tokio::test]
	async fn detach_accepts_null_result() {
		let (client, controller) = client();
		let task = tokio::spawn({
			let client = client.clone();
			async move { client.detach(true).await }
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		controller.inject_response(0, Value::Null);
		task.await.unwrap().unwrap();
	}
}
