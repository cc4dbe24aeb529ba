//! Runtime plumbing for talking to a Delve debug backend.
//!
//! This crate owns everything below the session orchestrator:
//! * starting and stopping a headless `dlv` server ([`backend`])
//! * the line-framed JSON-RPC transport and request correlation ([`transport`], [`connection`])
//! * a typed client over the `RPCServer` methods ([`client`])
//! * the bounded connect loop used at session bootstrap ([`connect`])

pub mod backend;
pub mod client;
pub mod connect;
pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod process;
pub mod transport;

pub use backend::{BackendMode, BackendProcess, BackendSpec, BackendStdio, locate_dlv};
pub use client::{DelveClient, PendingState};
pub use connect::{ConnectOptions, connect_with_retry};
pub use connection::{Connection, PendingCall};
pub use error::{Error, Result};
