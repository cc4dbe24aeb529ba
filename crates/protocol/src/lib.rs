//! Wire types for the Delve headless JSON-RPC API (version 2).
//!
//! This crate contains the serde-serializable types used for communication
//! with a `dlv --headless --api-version=2` server. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with protocol: Match Delve's `service/api` and `service/rpc2` structs
//! * Lenient: Go encodes nil slices and maps as `null`, so every collection
//!   field tolerates `null` and missing keys
//!
//! Higher-level projections are built on top of these types in `godbg`.

pub mod breakpoint;
pub mod command;
pub mod state;
pub mod variable;

pub use breakpoint::*;
pub use command::*;
pub use state::*;
pub use variable::*;

use serde::{Deserialize, Deserializer};

/// Deserializes `null` as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
