use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
///
/// stdout carries the response stream, so nothing is ever logged there.
pub fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "godbg=info,warn",
		_ => "godbg=debug,info",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(true))
		.try_init();
}
