//! Variable evaluation and depth-bounded formatting.
//!
//! Every returned [`Variable`] carries an `expression` that re-evaluates to the
//! same value, so any child can be expanded further with its own depth.

use godbg_protocol::{self as wire, Kind, LoadConfig};
use tracing::debug;

use crate::debugger::Debugger;
use crate::error::{DebugError, Result};
use crate::model::{EvaluateResponse, ScopeResponse, Variable, VariableKind};
use crate::session::eval_scope;

impl Debugger {
	/// Evaluates `expr` in the selected goroutine's top frame.
	pub async fn evaluate(&mut self, expr: &str, depth: Option<u32>) -> Result<EvaluateResponse> {
		if expr.trim().is_empty() {
			return Err(DebugError::InvalidArgument("expression must not be empty".to_string()));
		}
		let depth = depth.unwrap_or(self.config().default_depth);
		let cfg = self.load_config(depth);
		let wait = self.config().eval_wait();
		let poll = self.config().poll_interval();

		let session = self.session_mut()?;
		session.ensure_alive()?;
		let snapshot = session.require_stopped(wait, poll).await?;
		let scope = eval_scope(&snapshot)?;

		let raw = match session.client.eval(scope, expr, cfg).await {
			Ok(raw) => raw,
			Err(godbg_runtime::Error::Rpc { message, .. }) => {
				return Err(DebugError::EvalFailed {
					expr: expr.to_string(),
					message,
				});
			}
			Err(e) => return Err(e.into()),
		};
		debug!(target = "godbg.session", expr, depth, "evaluated");

		Ok(EvaluateResponse {
			variable: format_variable(&raw, expr, expr, depth),
			context: self.context("evaluate", &snapshot, None),
		})
	}

	/// Local variables and function arguments of the top frame.
	pub async fn list_scope(&mut self, depth: Option<u32>) -> Result<ScopeResponse> {
		let depth = depth.unwrap_or(self.config().default_depth);
		let cfg = self.load_config(depth);
		let wait = self.config().eval_wait();
		let poll = self.config().poll_interval();

		let session = self.session_mut()?;
		session.ensure_alive()?;
		let snapshot = session.require_stopped(wait, poll).await?;
		let scope = eval_scope(&snapshot)?;

		let locals = session.client.list_local_vars(scope, cfg).await?;
		let arguments = session.client.list_function_args(scope, cfg).await?;

		Ok(ScopeResponse {
			locals: locals.iter().map(|v| format_variable(v, &v.name, &v.name, depth)).collect(),
			arguments: arguments.iter().map(|v| format_variable(v, &v.name, &v.name, depth)).collect(),
			context: self.context("list_scope", &snapshot, None),
		})
	}

	fn load_config(&self, depth: u32) -> LoadConfig {
		LoadConfig {
			follow_pointers: true,
			max_variable_recurse: i64::from(depth),
			max_string_len: self.config().max_string_len,
			max_array_values: self.config().max_array_values,
			max_struct_fields: -1,
		}
	}
}

pub fn classify(kind: Kind) -> VariableKind {
	match kind {
		Kind::Bool => VariableKind::Boolean,
		Kind::Int
		| Kind::Int8
		| Kind::Int16
		| Kind::Int32
		| Kind::Int64
		| Kind::Uint
		| Kind::Uint8
		| Kind::Uint16
		| Kind::Uint32
		| Kind::Uint64
		| Kind::Uintptr => VariableKind::Integer,
		Kind::Float32 | Kind::Float64 | Kind::Complex64 | Kind::Complex128 => VariableKind::Float,
		Kind::String => VariableKind::String,
		Kind::Array | Kind::Slice => VariableKind::Array,
		Kind::Map => VariableKind::Map,
		Kind::Struct => VariableKind::Struct,
		Kind::Ptr | Kind::UnsafePointer => VariableKind::Pointer,
		Kind::Interface => VariableKind::Interface,
		Kind::Chan => VariableKind::Channel,
		Kind::Func => VariableKind::Function,
		Kind::Invalid => VariableKind::Unknown,
	}
}

/// Projects a backend variable, expanding children for `depth` more levels.
pub fn format_variable(raw: &wire::Variable, name: &str, expression: &str, depth: u32) -> Variable {
	let kind = classify(raw.kind);
	let mut variable = Variable {
		name: name.to_string(),
		type_name: raw.type_name.clone(),
		value: render_value(raw, kind),
		kind,
		expression: expression.to_string(),
		length: matches!(kind, VariableKind::Array | VariableKind::Map | VariableKind::String).then_some(raw.len),
		children: Vec::new(),
	};
	if depth == 0 || !raw.unreadable.is_empty() {
		return variable;
	}

	let next = depth - 1;
	variable.children = match kind {
		VariableKind::Struct => raw
			.children
			.iter()
			.map(|field| format_variable(field, &field.name, &field_path(expression, &field.name), next))
			.collect(),
		VariableKind::Array => raw
			.children
			.iter()
			.enumerate()
			.map(|(i, elem)| {
				let index = format!("[{i}]");
				format_variable(elem, &index, &format!("{}{index}", operand(expression)), next)
			})
			.collect(),
		VariableKind::Map => raw
			.children
			.chunks(2)
			.filter(|pair| pair.len() == 2)
			.map(|pair| {
				let key = key_literal(&pair[0]);
				format_variable(&pair[1], &format!("[{key}]"), &format!("{}[{key}]", operand(expression)), next)
			})
			.collect(),
		VariableKind::Pointer if !is_nil(raw) => raw
			.children
			.iter()
			.take(1)
			.map(|target| format_variable(target, &format!("*{name}"), &format!("*{}", operand(expression)), next))
			.collect(),
		VariableKind::Interface if !is_nil(raw) => raw
			.children
			.iter()
			.take(1)
			.map(|dynamic| format_variable(dynamic, "data", &format!("{}.({})", operand(expression), dynamic.type_name), next))
			.collect(),
		_ => Vec::new(),
	};
	variable
}

fn render_value(raw: &wire::Variable, kind: VariableKind) -> String {
	if !raw.unreadable.is_empty() {
		return format!("<unreadable: {}>", raw.unreadable);
	}
	match kind {
		VariableKind::String => {
			let mut text = format!("{:?}", raw.value);
			let loaded = raw.value.len() as i64;
			if raw.len > loaded {
				text.push_str(&format!("...+{} more", raw.len - loaded));
			}
			text
		}
		VariableKind::Array if raw.kind == Kind::Slice => {
			if raw.base == 0 && raw.len == 0 && raw.cap == 0 {
				"nil".to_string()
			} else {
				format!("{} len: {}, cap: {}", raw.type_name, raw.len, raw.cap)
			}
		}
		VariableKind::Array => format!("{} len: {}", raw.type_name, raw.len),
		VariableKind::Map => {
			if raw.base == 0 && raw.len == 0 && raw.children.is_empty() {
				"nil".to_string()
			} else {
				format!("{} len: {}", raw.type_name, raw.len)
			}
		}
		VariableKind::Struct => format!("{} {{...}}", raw.type_name),
		VariableKind::Pointer => {
			if is_nil(raw) {
				"nil".to_string()
			} else {
				let pointee = raw.children.first().map(|c| c.addr).filter(|a| *a != 0).unwrap_or(raw.addr);
				format!("({})(0x{pointee:x})", raw.type_name)
			}
		}
		VariableKind::Interface => match raw.children.first() {
			Some(dynamic) if !is_nil(raw) => format!("{}({})", raw.type_name, dynamic.type_name),
			_ => "nil".to_string(),
		},
		VariableKind::Channel => {
			if is_nil(raw) {
				"nil".to_string()
			} else {
				format!("{} {}/{}", raw.type_name, raw.len, raw.cap)
			}
		}
		VariableKind::Function => {
			if raw.value.is_empty() {
				"nil".to_string()
			} else {
				raw.value.clone()
			}
		}
		_ => {
			if raw.value.is_empty() {
				format!("<{}>", raw.type_name)
			} else {
				raw.value.clone()
			}
		}
	}
}

/// Pointer, interface and channel variables without a target read as `nil`.
fn is_nil(raw: &wire::Variable) -> bool {
	if raw.value == "nil" {
		return true;
	}
	match raw.kind {
		Kind::Ptr | Kind::UnsafePointer => raw.children.first().is_none_or(|c| c.addr == 0),
		Kind::Interface => raw.children.first().is_none_or(|c| c.kind == Kind::Invalid && c.addr == 0),
		Kind::Chan => raw.base == 0 && raw.children.is_empty(),
		_ => false,
	}
}

fn key_literal(key: &wire::Variable) -> String {
	match key.kind {
		Kind::String => format!("{:?}", key.value),
		_ => key.value.clone(),
	}
}

fn field_path(parent: &str, field: &str) -> String {
	format!("{}.{field}", operand(parent))
}

/// Parenthesises dereference expressions so selectors bind to the pointee.
fn operand(expr: &str) -> String {
	if expr.starts_with('*') {
		format!("({expr})")
	} else {
		expr.to_string()
	}
}
