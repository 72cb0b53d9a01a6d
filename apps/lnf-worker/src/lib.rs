pub mod worker;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lnf_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = lnf_cli::VERSION,
	rename_all = "kebab",
	styles = lnf_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Deliver every due notification, then exit instead of polling.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lnf_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let state = worker::WorkerState {
		db,
		notifier: config.providers.notifier,
		settings: config.worker,
	};

	if args.once {
		let delivered = worker::drain(&state).await?;

		tracing::info!(delivered, "Notification outbox drained.");

		return Ok(());
	}

	worker::run_worker(state).await?;

	Ok(())
}

fn init_tracing(config: &lnf_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
