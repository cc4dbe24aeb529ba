//! Breakpoint wire types and the `CreateBreakpoint`/`ListBreakpoints`/`ClearBreakpoint` payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::null_as_default;
use crate::variable::LoadConfig;

/// A breakpoint as stored by the backend.
///
/// The backend assigns `id` and counts hits; clients only fill in a location
/// when creating one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoint {
	pub id: i64,
	pub name: String,
	pub addr: u64,
	#[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub addrs: Vec<u64>,
	pub file: String,
	pub line: i64,
	#[serde(rename = "functionName", skip_serializing_if = "String::is_empty")]
	pub function_name: String,
	#[serde(rename = "Cond", skip_serializing_if = "String::is_empty")]
	pub cond: String,
	#[serde(rename = "HitCond", skip_serializing_if = "String::is_empty")]
	pub hit_cond: String,
	#[serde(rename = "continue")]
	pub tracepoint: bool,
	#[serde(rename = "goroutine")]
	pub goroutine: bool,
	pub stacktrace: i64,
	#[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub variables: Vec<String>,
	#[serde(rename = "LoadArgs", skip_serializing_if = "Option::is_none")]
	pub load_args: Option<LoadConfig>,
	#[serde(rename = "LoadLocals", skip_serializing_if = "Option::is_none")]
	pub load_locals: Option<LoadConfig>,
	#[serde(rename = "hitCount", deserialize_with = "null_as_default")]
	pub hit_count: HashMap<String, u64>,
	#[serde(rename = "totalHitCount")]
	pub total_hit_count: u64,
	pub disabled: bool,
}

/// Input of `RPCServer.CreateBreakpoint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBreakpointIn {
	#[serde(rename = "Breakpoint")]
	pub breakpoint: Breakpoint,
}

/// Output of `RPCServer.CreateBreakpoint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateBreakpointOut {
	#[serde(rename = "Breakpoint")]
	pub breakpoint: Breakpoint,
}

/// Input of `RPCServer.ListBreakpoints`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBreakpointsIn {
	#[serde(rename = "All")]
	pub all: bool,
}

/// Output of `RPCServer.ListBreakpoints`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListBreakpointsOut {
	#[serde(rename = "Breakpoints", deserialize_with = "null_as_default")]
	pub breakpoints: Vec<Breakpoint>,
}

/// Input of `RPCServer.ClearBreakpoint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearBreakpointIn {
	#[serde(rename = "Id")]
	pub id: i64,
	#[serde(rename = "Name", skip_serializing_if = "String::is_empty")]
	pub name: String,
}

/// Output of `RPCServer.ClearBreakpoint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearBreakpointOut {
	#[serde(rename = "Breakpoint")]
	pub breakpoint: Option<Breakpoint>,
}

/// A breakpoint the backend could not restore after a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscardedBreakpoint {
	pub breakpoint: Option<Breakpoint>,
	pub reason: String,
}
