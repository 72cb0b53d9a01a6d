use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lnf_admin::Args::parse();

	lnf_admin::run(args).await
}
