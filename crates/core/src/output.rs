//! Concurrent capture of the target's stdout/stderr.
//!
//! One task per stream reads lines and
//! 1. appends them to the shared history under a lock, then
//! 2. offers them to a bounded live queue with `try_send`, dropping on overflow.
//!
//! History and live queue are independent views: draining the queue never
//! removes anything from the history.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::model::{OutputRecord, OutputStream, now_ms};

/// Printed by headless `dlv` on its own stdout, which it shares with the target.
const LISTENING_BANNER: &str = "API server listening at:";

pub struct OutputCapture {
	history: Arc<Mutex<Vec<OutputRecord>>>,
	live_rx: Mutex<mpsc::Receiver<OutputRecord>>,
	shutdown: watch::Sender<bool>,
	tasks: Vec<JoinHandle<()>>,
}

impl OutputCapture {
	/// Starts one reader task per provided stream.
	pub fn start<O, E>(stdout: Option<O>, stderr: Option<E>, capacity: usize) -> Self
	where
		O: AsyncRead + Unpin + Send + 'static,
		E: AsyncRead + Unpin + Send + 'static,
	{
		let history = Arc::new(Mutex::new(Vec::new()));
		let (live_tx, live_rx) = mpsc::channel(capacity.max(1));
		let (shutdown, _) = watch::channel(false);

		let mut tasks = Vec::new();
		if let Some(stdout) = stdout {
			tasks.push(tokio::spawn(read_stream(
				OutputStream::Stdout,
				stdout,
				Arc::clone(&history),
				live_tx.clone(),
				shutdown.subscribe(),
			)));
		}
		if let Some(stderr) = stderr {
			tasks.push(tokio::spawn(read_stream(
				OutputStream::Stderr,
				stderr,
				Arc::clone(&history),
				live_tx,
				shutdown.subscribe(),
			)));
		}

		Self {
			history,
			live_rx: Mutex::new(live_rx),
			shutdown,
			tasks,
		}
	}

	/// A capture with no streams, used when the target's stdio is not ours.
	pub fn empty() -> Self {
		Self::start(None::<tokio::io::Empty>, None::<tokio::io::Empty>, 1)
	}

	/// Oldest undelivered live record, if any. Never blocks.
	pub fn peek_next(&self) -> Option<OutputRecord> {
		self.live_rx.lock().try_recv().ok()
	}

	/// Up to `limit` queued live records, oldest first. Never blocks.
	pub fn drain_available(&self, limit: usize) -> Vec<OutputRecord> {
		let mut rx = self.live_rx.lock();
		let mut records = Vec::new();
		while records.len() < limit {
			match rx.try_recv() {
				Ok(record) => records.push(record),
				Err(_) => break,
			}
		}
		records
	}

	/// Every record captured so far, in arrival order.
	pub fn history(&self) -> Vec<OutputRecord> {
		self.history.lock().clone()
	}

	/// Concatenated text of one stream.
	pub fn text(&self, stream: OutputStream) -> String {
		self.history.lock().iter().filter(|r| r.stream == stream).map(|r| r.text.as_str()).collect()
	}

	/// Signals the reader tasks to stop; captured history stays readable.
	pub fn shutdown(&mut self) {
		let _ = self.shutdown.send(true);
		for task in self.tasks.drain(..) {
			task.abort();
		}
	}
}

impl Drop for OutputCapture {
	fn drop(&mut self) {
		self.shutdown();
	}
}

async fn read_stream<R>(
	stream: OutputStream,
	reader: R,
	history: Arc<Mutex<Vec<OutputRecord>>>,
	live_tx: mpsc::Sender<OutputRecord>,
	mut shutdown: watch::Receiver<bool>,
) where
	R: AsyncRead + Unpin,
{
	let mut reader = BufReader::new(reader);
	let mut buf = Vec::new();
	let mut dropped = 0u64;

	loop {
		buf.clear();
		let read = tokio::select! {
			_ = shutdown.changed() => break,
			read = reader.read_until(b'\n', &mut buf) => read,
		};
		match read {
			Ok(0) => break,
			Ok(_) => {}
			Err(e) => {
				debug!(target = "godbg.output", %stream, error = %e, "stream read failed");
				break;
			}
		}

		let text = String::from_utf8_lossy(&buf).into_owned();
		if stream == OutputStream::Stdout && text.starts_with(LISTENING_BANNER) {
			continue;
		}
		trace!(target = "godbg.output", %stream, bytes = text.len(), "captured line");

		let record = OutputRecord {
			stream,
			text,
			timestamp: now_ms(),
		};
		history.lock().push(record.clone());

		if *shutdown.borrow() {
			break;
		}
		if live_tx.try_send(record).is_err() {
			dropped += 1;
		}
	}

	if dropped > 0 {
		debug!(target = "godbg.output", %stream, dropped, "live queue overflowed");
	}
	debug!(target = "godbg.output", %stream, "reader finished");
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::io::AsyncWriteExt;

	async fn settle() {
		tokio::time::sleep(Duration::from_millis(50)).await;
	}

	#[tokio::test]
	async fn history_keeps_every_line_in_order() {
		let stdout: &[u8] = b"API server listening at: 127.0.0.1:4000\nfirst\nsecond\nno newline";
		let stderr: &[u8] = b"oops\n";
		let capture = OutputCapture::start(Some(stdout), Some(stderr), 16);
		settle().await;

		assert_eq!(capture.text(OutputStream::Stdout), "first\nsecond\nno newline");
		assert_eq!(capture.text(OutputStream::Stderr), "oops\n");
		assert_eq!(capture.history().len(), 4);
	}

	#[tokio::test]
	async fn draining_does_not_touch_history() {
		let stdout: &[u8] = b"a\nb\nc\n";
		let capture = OutputCapture::start(Some(stdout), None::<&[u8]>, 16);
		settle().await;

		let first = capture.peek_next().unwrap();
		assert_eq!(first.text, "a\n");
		let rest = capture.drain_available(100);
		assert_eq!(rest.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(), vec!["b\n", "c\n"]);
		assert!(capture.peek_next().is_none());
		assert!(capture.drain_available(100).is_empty());

		assert_eq!(capture.text(OutputStream::Stdout), "a\nb\nc\n");
	}

	#[tokio::test]
	async fn drain_respects_limit() {
		let stdout: &[u8] = b"1\n2\n3\n4\n5\n";
		let capture = OutputCapture::start(Some(stdout), None::<&[u8]>, 16);
		settle().await;

		assert_eq!(capture.drain_available(2).len(), 2);
		assert_eq!(capture.drain_available(10).len(), 3);
	}

	#[tokio::test]
	async fn full_queue_drops_live_records_but_not_history() {
		let stdout: &[u8] = b"1\n2\n3\n4\n";
		let capture = OutputCapture::start(Some(stdout), None::<&[u8]>, 2);
		settle().await;

		assert_eq!(capture.drain_available(10).len(), 2);
		assert_eq!(capture.history().len(), 4);
	}

	#[tokio::test]
	async fn shutdown_stops_readers_and_keeps_history() {
		let (mut writer, reader) = tokio::io::duplex(64);
		let mut capture = OutputCapture::start(Some(reader), None::<&[u8]>, 16);

		writer.write_all(b"before\n").await.unwrap();
		settle().await;
		capture.shutdown();
		let _ = writer.write_all(b"after\n").await;
		settle().await;

		assert_eq!(capture.text(OutputStream::Stdout), "before\n");
	}

	#[tokio::test]
	async fn empty_capture_has_nothing() {
		let capture = OutputCapture::empty();
		assert!(capture.peek_next().is_none());
		assert!(capture.history().is_empty());
	}
}
