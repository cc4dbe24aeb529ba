//! JSON-RPC connection layer for the Delve API.
//!
//! This module implements the request/response correlation layer on top of the transport.
//! It handles:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Failing every in-flight request when the transport closes
//!
//! # Message Flow
//!
//! 1. Client calls [`Connection::start_call`] with a method and params
//! 2. Connection generates a unique ID and creates a oneshot channel
//! 3. Request is serialized and sent via transport
//! 4. Client holds a [`PendingCall`] and awaits it, optionally with a bound
//! 5. Message loop receives the response from transport
//! 6. Response is correlated by ID and sent via the oneshot channel
//!
//! Delve answers `RPCServer.Command{continue}` only once the target stops, so
//! several requests are routinely in flight at once: a pending resume plus
//! non-blocking state polls.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Request message in Go `net/rpc/jsonrpc` format.
///
/// ```json
/// {"method": "RPCServer.State", "params": [{"NonBlocking": true}], "id": 3}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub method: String,
	/// Go's codec expects exactly one positional argument.
	pub params: [Value; 1],
	pub id: u64,
}

/// Response message in Go `net/rpc/jsonrpc` format.
///
/// ```json
/// {"id": 3, "result": {"State": {}}, "error": null}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: u64,
	#[serde(default)]
	pub result: Option<Value>,
	/// Error string; `null` on success.
	#[serde(default)]
	pub error: Option<Value>,
}

type Callbacks = HashMap<u64, (String, oneshot::Sender<Result<Value>>)>;

/// JSON-RPC connection to a Delve server.
///
/// Connection is thread-safe and can be shared across async tasks using `Arc`.
/// Multiple concurrent requests are supported.
pub struct Connection {
	last_id: AtomicU64,
	callbacks: Arc<Mutex<Callbacks>>,
	sender: Mutex<Box<dyn Transport>>,
	receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	reader: parking_lot::Mutex<Option<AbortHandle>>,
	closed: AtomicBool,
}

/// A request that has been sent but whose response has not been consumed yet.
pub struct PendingCall {
	method: String,
	rx: oneshot::Receiver<Result<Value>>,
}

impl PendingCall {
	pub fn method(&self) -> &str {
		&self.method
	}

	/// Waits for the response without a bound.
	pub async fn wait(self) -> Result<Value> {
		self.rx.await.map_err(|_| Error::ChannelClosed)?
	}

	/// Waits for at most `limit`; `None` means the call is still in flight and
	/// may be awaited again.
	pub async fn wait_timeout(&mut self, limit: Duration) -> Option<Result<Value>> {
		match tokio::time::timeout(limit, &mut self.rx).await {
			Ok(Ok(result)) => Some(result),
			Ok(Err(_)) => Some(Err(Error::ChannelClosed)),
			Err(_) => None,
		}
	}
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		Self {
			last_id: AtomicU64::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			sender: Mutex::new(parts.sender),
			receiver: Mutex::new(Some(parts.receiver)),
			message_rx: Mutex::new(Some(parts.message_rx)),
			reader: parking_lot::Mutex::new(None),
			closed: AtomicBool::new(false),
		}
	}

	/// Returns `true` once the message loop has ended.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Sends a request and returns a handle to its eventual response.
	pub async fn start_call<P: Serialize>(&self, method: &str, params: P) -> Result<PendingCall> {
		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id, (method.to_string(), tx));

		let request = Request {
			method: method.to_string(),
			params: [serde_json::to_value(params)?],
			id,
		};
		tracing::trace!(target = "godbg.rpc", id, method, "sending request");

		let request_value = serde_json::to_value(&request)?;
		if let Err(err) = self.sender.lock().await.send(request_value).await {
			self.callbacks.lock().await.remove(&id);
			return Err(err);
		}

		Ok(PendingCall {
			method: method.to_string(),
			rx,
		})
	}

	/// Sends a request and awaits its response.
	pub async fn call<P: Serialize>(&self, method: &str, params: P) -> Result<Value> {
		self.start_call(method, params).await?.wait().await
	}

	/// Runs the message dispatch loop until the transport closes.
	///
	/// Spawn this in a background task; it can only run once per connection.
	pub async fn run(&self) {
		let Some(receiver) = self.receiver.lock().await.take() else {
			tracing::warn!(target = "godbg.rpc", "message loop already started");
			return;
		};
		let Some(mut message_rx) = self.message_rx.lock().await.take() else {
			return;
		};

		let transport_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::debug!(target = "godbg.rpc", error = %e, "transport ended with error");
			}
		});
		*self.reader.lock() = Some(transport_handle.abort_handle());

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Response>(message_value.clone()) {
				Ok(response) => {
					if let Err(e) = self.dispatch(response).await {
						tracing::error!(target = "godbg.rpc", error = %e, "error dispatching message");
					}
				}
				Err(e) => {
					tracing::error!(target = "godbg.rpc", error = %e, message = %message_value, "failed to parse message");
				}
			}
		}

		tracing::debug!(target = "godbg.rpc", "message loop ended (transport closed)");
		self.closed.store(true, Ordering::SeqCst);
		self.fail_pending().await;
		let _ = transport_handle.await;
	}

	/// Stops reading from the transport; in-flight calls fail with [`Error::ChannelClosed`].
	pub fn shutdown(&self) {
		self.closed.store(true, Ordering::SeqCst);
		if let Some(reader) = self.reader.lock().take() {
			reader.abort();
		}
	}

	async fn dispatch(&self, response: Response) -> Result<()> {
		let (method, callback) = self
			.callbacks
			.lock()
			.await
			.remove(&response.id)
			.ok_or_else(|| Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id)))?;

		let result = match response.error {
			Some(Value::Null) | None => Ok(response.result.unwrap_or(Value::Null)),
			Some(Value::String(message)) => Err(Error::Rpc { method, message }),
			Some(other) => Err(Error::Rpc {
				method,
				message: other.to_string(),
			}),
		};

		let _ = callback.send(result);
		Ok(())
	}

	async fn fail_pending(&self) {
		let pending: Vec<_> = self.callbacks.lock().await.drain().collect();
		for (_, (_, callback)) in pending {
			let _ = callback.send(Err(Error::ChannelClosed));
		}
	}
}
