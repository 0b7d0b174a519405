//! RAG Server binary
//!
//! Run with: cargo run -p llamacpp-rag --bin llamacpp-rag-server -- --config llamacpp-rag.toml

use clap::Parser;
use llamacpp_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "llamacpp-rag-server", version, about = "RAG over local documents with llama.cpp and pgvector")]
struct Args {
    /// TOML config file (defaults to ./llamacpp-rag.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Folder ingested by POST /api/ingest
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llamacpp_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      llama.cpp RAG                        ║
║        Document Q&A over PDF, text and Markdown           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.ingestion.data_dir = data_dir;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM: {} at {}", config.llm.model, config.llm.base_url);
    tracing::info!(
        "  - Embeddings: {:?} {} ({} dims) at {}",
        config.embeddings.provider,
        config.embeddings.model,
        config.embeddings.dimensions,
        config.embeddings.base_url
    );
    tracing::info!("  - Vector store: {:?} ({})", config.vector_db.backend, config.vector_db.table);
    tracing::info!("  - Chunk size: {} tokens", config.chunking.chunk_size);
    tracing::info!("  - Data dir: {}", config.ingestion.data_dir.display());

    let server = RagServer::new(config).await?;

    let state = server.state();
    if !state.llm().health_check().await.unwrap_or(false) {
        tracing::warn!(
            "llama.cpp server not reachable at {}; start it with: llama-server -m <model.gguf> --port 8080",
            state.config().llm.base_url
        );
    }
    if !state.embedder().health_check().await.unwrap_or(false) {
        tracing::warn!(
            "Embedding endpoint not reachable at {}",
            state.config().embeddings.base_url
        );
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/api/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest        - Ingest the data directory");
    println!("  POST /api/ingest/upload - Upload documents");
    println!("  GET  /api/chat?q=       - Ask a question");
    println!("  POST /api/query         - Ask with options, returns sources");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
