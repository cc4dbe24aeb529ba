//! Newline-delimited JSON transport to a Delve JSON-RPC endpoint.
//!
//! Delve's `net/rpc/jsonrpc` codec writes one JSON document per line, so both
//! directions are framed by `\n`. The transport is split into a sending half
//! and a receiving loop so the connection can write requests while responses
//! are still being read.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

/// Sending half of a transport.
pub trait Transport: Send {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport; `run` forwards every inbound message until EOF.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves of a transport plus the channel the receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

/// Line-framed JSON transport over any split async stream.
pub struct LineTransport;

impl LineTransport {
	/// Connects to `address` over TCP.
	pub async fn connect(address: &str) -> Result<TransportParts> {
		let stream = TcpStream::connect(address).await?;
		stream.set_nodelay(true)?;
		let (read, write) = stream.into_split();
		Ok(Self::from_halves(read, write))
	}

	pub fn from_halves<R, W>(read: R, write: W) -> TransportParts
	where
		R: AsyncRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		TransportParts {
			sender: Box::new(LineSender { write }),
			receiver: Box::new(LineReceiver {
				read: BufReader::new(read),
				message_tx,
			}),
			message_rx,
		}
	}
}

struct LineSender<W> {
	write: W,
}

impl<W> Transport for LineSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let mut payload = serde_json::to_vec(&message)?;
			payload.push(b'\n');
			self.write.write_all(&payload).await?;
			self.write.flush().await?;
			Ok(())
		})
	}
}

struct LineReceiver<R> {
	read: BufReader<R>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl<R> TransportReceiver for LineReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let mut line = String::new();
			loop {
				line.clear();
				if self.read.read_line(&mut line).await? == 0 {
					debug!(target = "godbg.rpc", "transport reached EOF");
					return Ok(());
				}
				let trimmed = line.trim();
				if trimmed.is_empty() {
					continue;
				}
				match serde_json::from_str::<JsonValue>(trimmed) {
					Ok(message) => {
						if self.message_tx.send(message).is_err() {
							return Ok(());
						}
					}
					Err(err) => warn!(target = "godbg.rpc", error = %err, "discarding malformed message"),
				}
			}
		})
	}
}
