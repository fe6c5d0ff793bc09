use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use claims_rag::core::config::{AppPaths, ConfigService};
use claims_rag::core::logging;
use claims_rag::llm::build_provider;
use claims_rag::rag::{DocumentLoader, Indexer, SqliteVectorStore, VectorStore};

#[derive(Parser)]
#[command(name = "build-index")]
#[command(about = "Embed the document directory into the vector index", long_about = None)]
struct Cli {
    /// Directory of *.txt documents (defaults to rag.data_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Index directory (defaults to rag.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,
    /// Only build when the index is empty or was embedded with another model
    #[arg(long)]
    if_missing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    logging::init_cli();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone())
        .load_config()
        .context("Failed to load configuration")?;

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| paths.resolve(&config.rag.data_dir));
    let index_dir = cli
        .index_dir
        .unwrap_or_else(|| paths.resolve(&config.rag.index_dir));

    let provider = build_provider(&config.llm).context("Failed to build LLM provider")?;
    let store: Arc<dyn VectorStore> = Arc::new(
        SqliteVectorStore::open_dir(&index_dir)
            .await
            .with_context(|| format!("Failed to open index in {}", index_dir.display()))?,
    );

    let indexer = Indexer::from_config(&config, provider, store.clone());
    let loader = DocumentLoader::new(&data_dir).relative_to(&paths.project_root);

    let report = if cli.if_missing {
        indexer.ensure_built(&loader).await?
    } else {
        Some(indexer.build_from_dir(&loader).await?)
    };

    match report {
        Some(report) => println!(
            "Indexed {} documents into {} chunks in {}ms ({})",
            report.documents,
            report.chunks,
            report.elapsed_ms,
            index_dir.display()
        ),
        None => println!(
            "Index is up to date with {} chunks ({})",
            store.count().await?,
            index_dir.display()
        ),
    }

    Ok(())
}
