//! Breakpoint registry over the backend's breakpoint store.
//!
//! The backend assigns ids and counts hits; nothing is cached here.

use std::path::Path;

use godbg_protocol as wire;
use tracing::info;

use crate::debugger::Debugger;
use crate::error::{DebugError, Result};
use crate::model::{Breakpoint, BreakpointListResponse, BreakpointResponse, SourceLocation};
use crate::projector::package_of;

impl Debugger {
	/// Sets a breakpoint at `file:line`.
	pub async fn set_breakpoint(&mut self, file: &str, line: i64) -> Result<BreakpointResponse> {
		if file.trim().is_empty() {
			return Err(DebugError::InvalidArgument("file must not be empty".to_string()));
		}
		if line < 1 {
			return Err(DebugError::InvalidArgument(format!("line must be positive, got {line}")));
		}
		let session = self.session_mut()?;
		session.ensure_alive()?;

		let file = resolve_source_path(file);
		let created = session.client.create_breakpoint(&file, line).await?;
		let breakpoint = project_breakpoint(&created);
		info!(target = "godbg.session", id = breakpoint.id, location = %breakpoint.location.short(), "breakpoint set");

		Ok(BreakpointResponse {
			breakpoint,
			context: self.current_context("set_breakpoint").await?,
		})
	}

	/// All user breakpoints currently known to the backend.
	pub async fn list_breakpoints(&mut self) -> Result<BreakpointListResponse> {
		let session = self.session_mut()?;
		let breakpoints = user_breakpoints(session.client.list_breakpoints().await?);
		Ok(BreakpointListResponse {
			breakpoints,
			context: self.current_context("list_breakpoints").await?,
		})
	}

	/// Removes breakpoint `id`, resolved against a fresh listing.
	pub async fn remove_breakpoint(&mut self, id: i64) -> Result<BreakpointResponse> {
		let session = self.session_mut()?;
		let listed = user_breakpoints(session.client.list_breakpoints().await?);
		let Some(existing) = listed.into_iter().find(|bp| bp.id == id) else {
			return Err(DebugError::BreakpointNotFound { id });
		};

		let cleared = session.client.clear_breakpoint(id).await?;
		let breakpoint = cleared.as_ref().map(project_breakpoint).unwrap_or(existing);
		info!(target = "godbg.session", id, "breakpoint removed");

		Ok(BreakpointResponse {
			breakpoint,
			context: self.current_context("remove_breakpoint").await?,
		})
	}
}

/// Drops the backend's internal breakpoints (panic and throw traps use ids <= 0).
fn user_breakpoints(raw: Vec<wire::Breakpoint>) -> Vec<Breakpoint> {
	raw.iter().filter(|bp| bp.id > 0).map(project_breakpoint).collect()
}

pub(crate) fn project_breakpoint(raw: &wire::Breakpoint) -> Breakpoint {
	let location = SourceLocation {
		file: raw.file.clone(),
		line: raw.line,
		function: raw.function_name.clone(),
		package: package_of(&raw.function_name),
	};
	let mut description = format!("breakpoint {} at {}", raw.id, location.short());
	if !location.function.is_empty() {
		description.push_str(&format!(" in {}", location.function));
	}
	if raw.total_hit_count > 0 {
		description.push_str(&format!(", hit {} time{}", raw.total_hit_count, if raw.total_hit_count == 1 { "" } else { "s" }));
	}
	if raw.disabled {
		description.push_str(" (disabled)");
	}

	Breakpoint {
		id: raw.id,
		location,
		enabled: !raw.disabled,
		hit: raw.total_hit_count > 0,
		hit_count: raw.total_hit_count,
		description,
	}
}

/// Relative paths are made absolute so they match the binary's debug info.
fn resolve_source_path(file: &str) -> String {
	let path = Path::new(file);
	if path.is_absolute() {
		return file.to_string();
	}
	std::fs::canonicalize(path)
		.map(|p| p.display().to_string())
		.unwrap_or_else(|_| file.to_string())
}
