//! Variable wire types and evaluation payloads.

use serde::{Deserialize, Serialize};

use crate::null_as_default;

/// Go `reflect.Kind` as reported in `Variable.kind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Kind {
	#[default]
	Invalid,
	Bool,
	Int,
	Int8,
	Int16,
	Int32,
	Int64,
	Uint,
	Uint8,
	Uint16,
	Uint32,
	Uint64,
	Uintptr,
	Float32,
	Float64,
	Complex64,
	Complex128,
	Array,
	Chan,
	Func,
	Interface,
	Map,
	Ptr,
	Slice,
	String,
	Struct,
	UnsafePointer,
}

const KINDS: [Kind; 27] = [
	Kind::Invalid,
	Kind::Bool,
	Kind::Int,
	Kind::Int8,
	Kind::Int16,
	Kind::Int32,
	Kind::Int64,
	Kind::Uint,
	Kind::Uint8,
	Kind::Uint16,
	Kind::Uint32,
	Kind::Uint64,
	Kind::Uintptr,
	Kind::Float32,
	Kind::Float64,
	Kind::Complex64,
	Kind::Complex128,
	Kind::Array,
	Kind::Chan,
	Kind::Func,
	Kind::Interface,
	Kind::Map,
	Kind::Ptr,
	Kind::Slice,
	Kind::String,
	Kind::Struct,
	Kind::UnsafePointer,
];

impl From<u32> for Kind {
	fn from(value: u32) -> Self {
		KINDS.get(value as usize).copied().unwrap_or_default()
	}
}

impl From<Kind> for u32 {
	fn from(kind: Kind) -> Self {
		KINDS.iter().position(|k| *k == kind).unwrap_or(0) as u32
	}
}

/// A variable as loaded by the backend.
///
/// For maps, `children` alternates key and value entries. For pointers and
/// interfaces, the single child is the pointee / dynamic value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variable {
	pub name: String,
	pub addr: u64,
	#[serde(rename = "onlyAddr")]
	pub only_addr: bool,
	#[serde(rename = "type")]
	pub type_name: String,
	#[serde(rename = "realType")]
	pub real_type: String,
	pub flags: u16,
	pub kind: Kind,
	pub value: String,
	pub len: i64,
	pub cap: i64,
	#[serde(deserialize_with = "null_as_default")]
	pub children: Vec<Variable>,
	pub base: u64,
	pub unreadable: String,
	#[serde(rename = "LocationExpr")]
	pub location_expr: String,
	#[serde(rename = "DeclLine")]
	pub decl_line: i64,
}

/// Controls how deep the backend loads composite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
	#[serde(rename = "FollowPointers")]
	pub follow_pointers: bool,
	#[serde(rename = "MaxVariableRecurse")]
	pub max_variable_recurse: i64,
	#[serde(rename = "MaxStringLen")]
	pub max_string_len: i64,
	#[serde(rename = "MaxArrayValues")]
	pub max_array_values: i64,
	#[serde(rename = "MaxStructFields")]
	pub max_struct_fields: i64,
}

impl Default for LoadConfig {
	fn default() -> Self {
		Self {
			follow_pointers: true,
			max_variable_recurse: 1,
			max_string_len: 64,
			max_array_values: 64,
			max_struct_fields: -1,
		}
	}
}

/// Goroutine/frame selection for evaluation requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalScope {
	#[serde(rename = "GoroutineID")]
	pub goroutine_id: i64,
	#[serde(rename = "Frame")]
	pub frame: i64,
	#[serde(rename = "DeferredCall")]
	pub deferred_call: i64,
}

/// Input of `RPCServer.Eval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalIn {
	#[serde(rename = "Scope")]
	pub scope: EvalScope,
	#[serde(rename = "Expr")]
	pub expr: String,
	#[serde(rename = "Cfg")]
	pub cfg: Option<LoadConfig>,
}

/// Output of `RPCServer.Eval`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOut {
	#[serde(rename = "Variable")]
	pub variable: Option<Variable>,
}

/// Input of `RPCServer.ListLocalVars` and `RPCServer.ListFunctionArgs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeVarsIn {
	#[serde(rename = "Scope")]
	pub scope: EvalScope,
	#[serde(rename = "Cfg")]
	pub cfg: LoadConfig,
}

/// Output of `RPCServer.ListLocalVars`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLocalVarsOut {
	#[serde(rename = "Variables", deserialize_with = "null_as_default")]
	pub variables: Vec<Variable>,
}

/// Output of `RPCServer.ListFunctionArgs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFunctionArgsOut {
	#[serde(rename = "Args", deserialize_with = "null_as_default")]
	pub args: Vec<Variable>,
}
