#![allow(clippy::result_large_err)]

use clap::{CommandFactory, error::ErrorKind};
use skit::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.without_time()
		.init();

	match skit::cli::main_entrypoint().await {
		Ok(()) => {}
		Err(e) => {
			let mut cmd = Cli::command();
			cmd.error(ErrorKind::InvalidValue, e).exit();
		}
	}
}
