use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mnema_service::{DeleteAllRequest, MemoryService, SearchRequest, StoreRequest};
use mnema_storage::FsBlobStore;

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Store one fact for a user.
	Store {
		#[arg(long)]
		user: String,
		#[arg(long)]
		content: String,
		#[arg(long, default_value_t = 0.5)]
		importance: f32,
		#[arg(long, default_value = "general")]
		category: String,
		#[arg(long = "topic")]
		topics: Vec<String>,
	},
	/// Search a user's memories by meaning.
	Search {
		#[arg(long)]
		user: String,
		#[arg(long)]
		query: String,
		#[arg(long)]
		top_k: Option<u32>,
	},
	/// Delete every memory for a user. Irreversible.
	DeleteAll {
		#[arg(long)]
		user: String,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = mnema_config::load(&args.config)?;

	init_tracing(&cfg)?;

	let blob = Arc::new(FsBlobStore::new(cfg.storage.root.clone()));
	let service = MemoryService::new(cfg, blob);
	let output = match args.command {
		Command::Store { user, content, importance, category, topics } => {
			let response = service
				.store(StoreRequest { user_key: user, content, importance, category, topics })
				.await?;

			serde_json::to_value(&response)?
		},
		Command::Search { user, query, top_k } => {
			let response =
				service.search(SearchRequest { user_key: user, query, top_k }).await?;

			serde_json::to_value(&response)?
		},
		Command::DeleteAll { user } => {
			let response = service.delete_all(DeleteAllRequest { user_key: user }).await?;

			serde_json::to_value(&response)?
		},
	};

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

fn init_tracing(cfg: &mnema_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
