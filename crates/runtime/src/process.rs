//! Process and port lifecycle helpers shared by the bootstrapper and orchestrator.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Returns `true` when a process with `pid` appears alive on this platform.
pub fn pid_is_alive(pid: u32) -> bool {
	#[cfg(unix)]
	{
		if pid == 0 {
			return false;
		}

		if PathBuf::from("/proc").join(pid.to_string()).exists() {
			return true;
		}

		std::process::Command::new("kill")
			.arg("-0")
			.arg(pid.to_string())
			.status()
			.map(|status| status.success())
			.unwrap_or(pid == std::process::id())
	}

	#[cfg(not(unix))]
	{
		pid == std::process::id()
	}
}

/// Asks the OS for an unused port on `host`.
///
/// The listener is dropped before returning, so the port is only likely to be
/// free; the backend binds it moments later.
pub fn free_port(host: &str) -> Result<u16> {
	let listener = std::net::TcpListener::bind((host, 0)).map_err(|e| Error::BackendStartup(format!("could not allocate a port on {host}: {e}")))?;
	Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(unix)]
	#[test]
	fn current_process_is_alive() {
		assert!(pid_is_alive(std::process::id()));
	}

	#[cfg(unix)]
	#[test]
	fn pid_zero_is_never_alive() {
		assert!(!pid_is_alive(0));
	}

	#[test]
	fn free_port_is_bindable() {
		let port = free_port("127.0.0.1").unwrap();
		assert_ne!(port, 0);
		assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
	}
}
