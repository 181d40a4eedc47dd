use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = mnema_cli::Args::parse();
	mnema_cli::run(args).await
}
