use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Import from our modular crates
use lr_anthropic::AnthropicClient;
use lr_core::{Embedder, VectorStore};
use lr_rag::{
    HashEmbedder, HttpEmbedder, InMemorySessionStore, LocalVectorStore, QdrantVectorStore,
    RagConfig, RagSystem,
};
use lr_server::{AppState, create_app, serve};

#[derive(Parser)]
#[command(name = "lessonrag")]
#[command(about = "Question answering over course materials", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Folder of course documents loaded at startup
    #[arg(long, env = "DOCS_DIR", default_value = "../docs")]
    docs_dir: PathBuf,

    /// Static frontend served for non-API paths
    #[arg(long, env = "FRONTEND_DIR", default_value = "../frontend")]
    frontend_dir: PathBuf,

    /// Drop stored courses before loading the documents folder
    #[arg(long)]
    clear_existing: bool,
}

fn build_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedding_url {
        Some(ref url) => {
            info!(url = %url, model = %config.embedding_model, "Using remote embeddings");
            let mut embedder =
                HttpEmbedder::new(url, &config.embedding_model, config.embedding_dimension)?;
            if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
                embedder = embedder.with_api_key(key);
            }
            Ok(Arc::new(embedder))
        }
        None => {
            info!(dimension = config.embedding_dimension, "Using local hash embeddings");
            Ok(Arc::new(HashEmbedder::new(config.embedding_dimension)))
        }
    }
}

async fn build_store(config: &RagConfig, embedder: Arc<dyn Embedder>) -> Result<Arc<dyn VectorStore>> {
    match config.qdrant_url {
        Some(ref url) => {
            let store = QdrantVectorStore::connect(url, &config.collection_prefix, embedder)
                .await
                .with_context(|| format!("failed to connect to Qdrant at {}", url))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("QDRANT_URL not set, course data is kept in memory");
            Ok(Arc::new(LocalVectorStore::new(embedder)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Initialize components
    let config = RagConfig::from_env()?;
    let provider = Arc::new(AnthropicClient::from_env()?);
    let embedder = build_embedder(&config)?;
    let store = build_store(&config, embedder).await?;
    let sessions = Arc::new(InMemorySessionStore::new(config.max_history));

    let rag = RagSystem::new(config, provider, store, sessions)?;

    let report = rag
        .add_course_folder(&cli.docs_dir, cli.clear_existing)
        .await?;
    info!(
        courses = report.courses_added,
        chunks = report.chunks_added,
        "Loaded course documents"
    );

    let app = create_app(AppState::new(rag), Some(&cli.frontend_dir));
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cli.host, cli.port))?;

    serve(addr, app).await?;
    Ok(())
}
