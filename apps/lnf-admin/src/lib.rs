use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lnf_domain::item::{Category, ItemType};
use lnf_service::{LnfService, SubmitItemRequest, Thumbnails};
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
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Apply the database schema and exit.
	InitSchema,
	/// Store a new lost or found report and process its image.
	Submit(SubmitArgs),
	/// Re-run image processing and matching for a stored item.
	Process {
		#[arg(long)]
		item_id: Uuid,
		#[arg(long, value_name = "FILE")]
		image: PathBuf,
		#[arg(long, value_name = "DIR")]
		thumbnails_dir: Option<PathBuf>,
	},
	/// Re-run matching for one item from its stored embedding.
	Rematch {
		#[arg(long)]
		item_id: Uuid,
	},
	/// Re-run matching for every open, processed item.
	RematchAll {
		#[arg(long)]
		batch_size: Option<u32>,
	},
}

#[derive(Debug, clap::Args)]
#[command(rename_all = "kebab")]
pub struct SubmitArgs {
	#[arg(long)]
	pub owner_id: Uuid,
	#[arg(long = "type", value_name = "LOST|FOUND")]
	pub item_type: ItemType,
	#[arg(long)]
	pub category: Category,
	#[arg(long)]
	pub title: String,
	#[arg(long)]
	pub description: Option<String>,
	#[arg(long)]
	pub brand: Option<String>,
	#[arg(long)]
	pub color: Option<String>,
	#[arg(long)]
	pub location: String,
	#[arg(long, allow_hyphen_values = true)]
	pub latitude: Option<f64>,
	#[arg(long, allow_hyphen_values = true)]
	pub longitude: Option<f64>,
	/// RFC 3339 timestamp; defaults to now.
	#[arg(long, value_parser = parse_timestamp)]
	pub occurred_at: Option<OffsetDateTime>,
	#[arg(long, value_name = "FILE")]
	pub image: PathBuf,
	#[arg(long, value_name = "DIR")]
	pub thumbnails_dir: Option<PathBuf>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lnf_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = LnfService::new(config, db);

	match args.command {
		Command::InitSchema => tracing::info!("Schema is up to date."),
		Command::Submit(submit) => {
			let image = read_image(&submit.image)?;
			let thumbnails_dir = submit.thumbnails_dir.clone();
			let response = service.submit_item(submit.into_request(image)).await?;

			if let (Some(dir), Some(processing)) = (thumbnails_dir, response.processing.as_ref()) {
				write_thumbnails(&dir, response.item_id, &processing.thumbnails)?;
			}

			print_json(&response)?;
		},
		Command::Process { item_id, image, thumbnails_dir } => {
			let image = read_image(&image)?;
			let result = service.process_item(item_id, &image).await?;

			if let Some(dir) = thumbnails_dir {
				write_thumbnails(&dir, item_id, &result.thumbnails)?;
			}

			print_json(&result)?;
		},
		Command::Rematch { item_id } => print_json(&service.rematch_item(item_id).await?)?,
		Command::RematchAll { batch_size } => {
			let batch_size = batch_size.unwrap_or(service.cfg.matching.rematch_batch_size);

			print_json(&service.rematch_open_items(batch_size).await?)?;
		},
	}

	Ok(())
}

impl SubmitArgs {
	fn into_request(self, image: Vec<u8>) -> SubmitItemRequest {
		SubmitItemRequest {
			owner_id: self.owner_id,
			item_type: self.item_type,
			category: self.category,
			title: self.title,
			description: self.description,
			brand: self.brand,
			color: self.color,
			location_name: self.location,
			latitude: self.latitude,
			longitude: self.longitude,
			occurred_at: self.occurred_at.unwrap_or_else(OffsetDateTime::now_utc),
			image,
		}
	}
}

fn init_tracing(config: &lnf_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
	OffsetDateTime::parse(raw, &Rfc3339)
}

fn read_image(path: &Path) -> color_eyre::Result<Vec<u8>> {
	fs::read(path).wrap_err_with(|| format!("Failed to read image {}.", path.display()))
}

fn write_thumbnails(dir: &Path, item_id: Uuid, thumbnails: &Thumbnails) -> color_eyre::Result<()> {
	if thumbnails.small.is_empty() || thumbnails.large.is_empty() {
		return Err(eyre::eyre!("No thumbnails were produced for item {item_id}."));
	}

	fs::create_dir_all(dir)?;

	for (suffix, bytes) in [("small", &thumbnails.small), ("large", &thumbnails.large)] {
		let path = dir.join(format!("{item_id}_{suffix}.jpg"));

		fs::write(&path, bytes)
			.wrap_err_with(|| format!("Failed to write thumbnail {}.", path.display()))?;
	}

	Ok(())
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}
