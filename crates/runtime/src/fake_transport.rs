//! Fake transport for unit testing JSON-RPC correlation.
//!
//! Provides an in-memory transport for testing the protocol layer without a
//! running `dlv`.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new().build();
//! let connection = Arc::new(Connection::new(parts));
//!
//! tokio::spawn({
//!     let conn = Arc::clone(&connection);
//!     async move { conn.run().await }
//! });
//!
//! let fut = connection.call("RPCServer.State", json!({"NonBlocking": true}));
//! controller.inject_response(0, json!({"State": {}}));
//! let result = fut.await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, mpsc};

use crate::Result;
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self {}
	}

	/// Build the fake transport and return both parts and a controller.
	///
	/// Dropping the controller closes the inbound side, which ends the
	/// connection's message loop.
	pub fn build(self) -> (TransportParts, FakeTransportController) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let sent_messages = Arc::new(Mutex::new(Vec::new()));

		let sender = FakeTransportSender {
			sent: Arc::clone(&sent_messages),
		};

		let receiver = FakeTransportReceiver { inbound_rx, message_tx };

		let controller = FakeTransportController {
			inbound_tx,
			sent: sent_messages,
		};

		let parts = TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		};

		(parts, controller)
	}
}

/// Controller for injecting responses and inspecting sent messages.
pub struct FakeTransportController {
	inbound_tx: mpsc::UnboundedSender<JsonValue>,
	sent: Arc<Mutex<Vec<JsonValue>>>,
}

impl FakeTransportController {
	/// Inject a raw JSON message into the connection.
	pub fn inject(&self, message: JsonValue) {
		let _ = self.inbound_tx.send(message);
	}

	/// Inject a successful response with the given ID and result.
	pub fn inject_response(&self, id: u64, result: JsonValue) {
		self.inject(serde_json::json!({
			"id": id,
			"result": result,
			"error": null
		}));
	}

	/// Inject an error response the way Go's codec encodes it.
	pub fn inject_error(&self, id: u64, message: &str) {
		self.inject(serde_json::json!({
			"id": id,
			"result": null,
			"error": message
		}));
	}

	/// Take all sent messages, clearing the buffer.
	pub async fn take_sent(&self) -> Vec<JsonValue> {
		std::mem::take(&mut *self.sent.lock().await)
	}
}

struct FakeTransportSender {
	sent: Arc<Mutex<Vec<JsonValue>>>,
}

impl Transport for FakeTransportSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		let sent = Arc::clone(&self.sent);
		Box::pin(async move {
			sent.lock().await.push(message);
			Ok(())
		})
	}
}

struct FakeTransportReceiver {
	inbound_rx: mpsc::UnboundedReceiver<JsonValue>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for FakeTransportReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(message) = self.inbound_rx.recv().await {
				if self.message_tx.send(message).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
