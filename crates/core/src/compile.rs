//! Builds debuggable binaries with the Go toolchain.
//!
//! Optimisations and inlining are disabled (`-gcflags=all=-N -l`) so line
//! stepping and variable inspection stay faithful to the source.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DebugError, Result};

const DEBUG_GCFLAGS: &str = "-gcflags=all=-N -l";

/// A compiled binary living in a temporary directory; dropping it deletes both.
#[derive(Debug)]
pub struct BuiltBinary {
	pub path: PathBuf,
	dir: TempDir,
}

impl BuiltBinary {
	pub fn dir(&self) -> &Path {
		self.dir.path()
	}
}

/// Resolves the `go` binary: an explicit path wins, otherwise `PATH` is searched.
pub fn locate_go(explicit: Option<&Path>) -> Result<PathBuf> {
	match explicit {
		Some(path) => which::which(path).map_err(|e| DebugError::BuildFailed(format!("go toolchain {}: {e}", path.display()))),
		None => which::which("go").map_err(|_| DebugError::BuildFailed("go toolchain not found on PATH".to_string())),
	}
}

/// Compiles a single `main` package source file.
pub async fn build_source(go: &Path, source: &Path) -> Result<BuiltBinary> {
	let source = checked_go_file(source)?;
	let dir = temp_dir()?;
	let path = dir.path().join(binary_name(&source, ""));

	let mut cmd = Command::new(go);
	cmd.arg("build").arg(DEBUG_GCFLAGS).arg("-o").arg(&path).arg(&source);
	if let Some(parent) = source.parent() {
		cmd.current_dir(parent);
	}
	run_build(cmd, &source).await?;

	info!(target = "godbg.session", source = %source.display(), binary = %path.display(), "built debug binary");
	Ok(BuiltBinary { path, dir })
}

/// Compiles the test binary of the package containing `test_file`.
pub async fn build_test(go: &Path, test_file: &Path) -> Result<BuiltBinary> {
	let source = checked_go_file(test_file)?;
	let package_dir = source
		.parent()
		.map(Path::to_path_buf)
		.ok_or_else(|| DebugError::InvalidArgument(format!("{} has no parent directory", source.display())))?;
	let dir = temp_dir()?;
	let path = dir.path().join(binary_name(&source, ".test"));

	let mut cmd = Command::new(go);
	cmd.arg("test").arg("-c").arg(DEBUG_GCFLAGS).arg("-o").arg(&path).current_dir(&package_dir);
	run_build(cmd, &source).await?;

	info!(target = "godbg.session", package = %package_dir.display(), binary = %path.display(), "built test binary");
	Ok(BuiltBinary { path, dir })
}

/// Program arguments that run exactly one test function.
pub fn test_run_args(test_name: &str, extra: &[String]) -> Vec<String> {
	let mut args = vec!["-test.run".to_string(), format!("^{test_name}$"), "-test.v".to_string()];
	args.extend(extra.iter().cloned());
	args
}

fn checked_go_file(path: &Path) -> Result<PathBuf> {
	if path.extension().and_then(|e| e.to_str()) != Some("go") {
		return Err(DebugError::InvalidArgument(format!("{} is not a .go file", path.display())));
	}
	std::fs::canonicalize(path).map_err(|e| DebugError::InvalidArgument(format!("{}: {e}", path.display())))
}

fn temp_dir() -> Result<TempDir> {
	tempfile::Builder::new()
		.prefix("godbg-build-")
		.tempdir()
		.map_err(|e| DebugError::BuildFailed(format!("cannot create build directory: {e}")))
}

fn binary_name(source: &Path, suffix: &str) -> String {
	let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("debug");
	format!("__debug_{stem}{suffix}")
}

async fn run_build(mut cmd: Command, source: &Path) -> Result<()> {
	debug!(target = "godbg.session", command = ?cmd, "running go toolchain");
	let output = cmd
		.output()
		.await
		.map_err(|e| DebugError::BuildFailed(format!("cannot run go toolchain: {e}")))?;
	if output.status.success() {
		return Ok(());
	}
	let stderr = String::from_utf8_lossy(&output.stderr);
	Err(DebugError::BuildFailed(format!("{} ({}): {}", source.display(), output.status, stderr.trim())))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_anchor_the_name() {
		let args = test_run_args("TestAdd", &["-count=1".to_string()]);
		assert_eq!(args, vec!["-test.run", "^TestAdd$", "-test.v", "-count=1"]);
	}

	#[test]
	fn non_go_files_are_rejected() {
		let err = checked_go_file(Path::new("/tmp/main.rs")).unwrap_err();
		assert_eq!(err.code(), "INVALID_ARGUMENT");
	}

	#[test]
	fn missing_go_file_is_rejected() {
		let err = checked_go_file(Path::new("/definitely/missing/main.go")).unwrap_err();
		assert_eq!(err.code(), "INVALID_ARGUMENT");
	}

	#[test]
	fn binary_names_are_derived_from_source() {
		assert_eq!(binary_name(Path::new("/src/app/main.go"), ""), "__debug_main");
		assert_eq!(binary_name(Path::new("/src/app/add_test.go"), ".test"), "__debug_add_test.test");
	}

	#[tokio::test]
	async fn failing_toolchain_reports_build_failure() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("main.go");
		std::fs::write(&source, "package main\n").unwrap();

		// `false` exits non-zero regardless of arguments.
		let Ok(fake_go) = which::which("false") else {
			return;
		};
		let err = build_source(&fake_go, &source).await.unwrap_err();
		assert_eq!(err.code(), "BUILD_FAILED");
	}
}
