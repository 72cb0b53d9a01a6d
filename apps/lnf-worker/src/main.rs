use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lnf_worker::Args::parse();

	lnf_worker::run(args).await
}
