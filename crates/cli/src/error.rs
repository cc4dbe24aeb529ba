use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Debugger error: {0}")]
	Debug(#[from] godbg::DebugError),

	#[error("Failed to load config {path}: {message}")]
	Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, CliError>;
