//! Command names accepted by the request loop.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
	Launch,
	Attach,
	Connect,
	DebugSource,
	DebugTest,
	Close,
	State,
	Continue,
	Step,
	StepOver,
	StepOut,
	Interrupt,
	Wait,
	Restart,
	SetBreakpoint,
	ListBreakpoints,
	RemoveBreakpoint,
	Evaluate,
	ListScope,
	Goroutines,
	GetOutput,
	PeekOutput,
	DrainOutput,
	Quit,
}

/// Catalog entry: primary name, aliases, and a one-line description.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandSpec {
	#[serde(skip)]
	pub id: CommandId,
	pub name: &'static str,
	pub aliases: &'static [&'static str],
	pub args: &'static str,
	pub about: &'static str,
}

const fn spec(id: CommandId, name: &'static str, aliases: &'static [&'static str], args: &'static str, about: &'static str) -> CommandSpec {
	CommandSpec { id, name, aliases, args, about }
}

pub const COMMANDS: &[CommandSpec] = &[
	spec(CommandId::Launch, "launch", &[], "program, args?", "start an executable under the debugger, halted at entry"),
	spec(CommandId::Attach, "attach", &[], "pid", "attach to a running process"),
	spec(CommandId::Connect, "connect", &[], "address", "adopt a running headless backend"),
	spec(CommandId::DebugSource, "debug_source", &["debug"], "file, args?", "compile a Go file without optimisations and launch it"),
	spec(CommandId::DebugTest, "debug_test", &["test"], "file, testName, args?", "compile the package tests and launch one test"),
	spec(CommandId::Close, "close", &["detach"], "", "end the session"),
	spec(CommandId::State, "state", &["status"], "", "report the current execution state"),
	spec(CommandId::Continue, "continue", &["c"], "", "resume until a breakpoint, exit, or the wait bound"),
	spec(CommandId::Step, "step", &["s", "step_into"], "", "step into the next call"),
	spec(CommandId::StepOver, "step_over", &["next", "n"], "", "step to the next line"),
	spec(CommandId::StepOut, "step_out", &["stepout", "finish"], "", "run until the current function returns"),
	spec(CommandId::Interrupt, "interrupt", &["halt", "pause"], "", "stop a running target"),
	spec(CommandId::Wait, "wait", &[], "timeoutMs?", "keep waiting for a running target to stop"),
	spec(CommandId::Restart, "restart", &[], "", "restart a launched program, keeping breakpoints"),
	spec(CommandId::SetBreakpoint, "set_breakpoint", &["break", "b"], "file, line", "set a breakpoint"),
	spec(CommandId::ListBreakpoints, "list_breakpoints", &["breakpoints"], "", "list breakpoints"),
	spec(CommandId::RemoveBreakpoint, "remove_breakpoint", &["clear"], "id", "remove a breakpoint"),
	spec(CommandId::Evaluate, "evaluate", &["eval", "print", "p"], "expression, depth?", "evaluate an expression in the current frame"),
	spec(CommandId::ListScope, "list_scope", &["locals"], "depth?", "list locals and arguments of the current frame"),
	spec(CommandId::Goroutines, "goroutines", &["threads"], "", "list goroutines"),
	spec(CommandId::GetOutput, "get_output", &["output"], "", "full captured stdout and stderr"),
	spec(CommandId::PeekOutput, "peek_output", &[], "", "oldest undelivered output record"),
	spec(CommandId::DrainOutput, "drain_output", &[], "", "all undelivered output records"),
	spec(CommandId::Quit, "quit", &["exit"], "", "close any session and stop reading requests"),
];

/// Resolves a primary name or alias.
pub fn lookup_command(name: &str) -> Option<CommandId> {
	COMMANDS
		.iter()
		.find(|c| c.name == name || c.aliases.contains(&name))
		.map(|c| c.id)
}

pub fn command_name(id: CommandId) -> &'static str {
	COMMANDS.iter().find(|c| c.id == id).map(|c| c.name).unwrap_or("unknown")
}
