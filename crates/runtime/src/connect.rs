//! Bounded poll-connect against a Delve endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::backend::BackendProcess;
use crate::client::DelveClient;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::LineTransport;

/// Timing for [`connect_with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
	/// Overall bound on the loop.
	pub timeout: Duration,
	/// Sleep between failed attempts.
	pub interval: Duration,
}

impl Default for ConnectOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(3),
			interval: Duration::from_millis(100),
		}
	}
}

/// Connects to `address` and returns a client whose first state query already succeeded.
///
/// When `backend` is given, an exit of that process ends the loop early with
/// [`Error::BackendExited`] instead of waiting out the timeout.
pub async fn connect_with_retry(address: &str, mut backend: Option<&mut BackendProcess>, options: ConnectOptions) -> Result<DelveClient> {
	let deadline = Instant::now() + options.timeout;
	let mut attempts = 0u32;

	loop {
		attempts += 1;
		if let Some(process) = backend.as_deref_mut() {
			if let Some(status) = process.try_exit_status() {
				return Err(Error::BackendExited { status: status.to_string() });
			}
		}

		match try_connect(address, deadline).await {
			Ok(Some(client)) => {
				info!(target = "godbg.backend", %address, attempts, "connected to backend");
				return Ok(client);
			}
			Ok(None) => debug!(target = "godbg.backend", %address, attempts, "attempt timed out"),
			Err(e) => debug!(target = "godbg.backend", %address, attempts, error = %e, "backend not ready"),
		}

		if Instant::now() + options.interval >= deadline {
			return Err(Error::ConnectTimeout {
				address: address.to_string(),
				timeout_ms: options.timeout.as_millis() as u64,
			});
		}
		tokio::time::sleep(options.interval).await;
	}
}

/// One attempt that gives up at `deadline`; `Ok(None)` means it ran out of time.
async fn try_connect(address: &str, deadline: Instant) -> Result<Option<DelveClient>> {
	let Ok(parts) = tokio::time::timeout_at(deadline, LineTransport::connect(address)).await else {
		return Ok(None);
	};
	let connection = Arc::new(Connection::new(parts?));
	tokio::spawn({
		let connection = Arc::clone(&connection);
		async move { connection.run().await }
	});

	let client = DelveClient::new(connection);
	match tokio::time::timeout_at(deadline, client.state(true)).await {
		Ok(Ok(_)) => Ok(Some(client)),
		Ok(Err(e)) if e.is_process_exited() => Ok(Some(client)),
		Ok(Err(e)) => {
			client.shutdown();
			Err(e)
		}
		Err(_) => {
			client.shutdown();
			Ok(None)
		}
	}
}
