//! RAG Server binary
//!
//! Run with: cargo run -p docs-rag --bin docs-rag-server [-- path/to/config.toml]

use docs_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docs_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                         Docs RAG                          ║
║        Documentation Q&A with Streamed Answers            ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Optional config file as the first argument, else DOCS_RAG_CONFIG
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DOCS_RAG_CONFIG").ok())
        .map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Embedding model: {}", config.embedding_model_id());
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Index: {}", config.index.storage_path.display());
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    // Create and start server; a failed chain leaves it running but not ready
    let server = RagServer::new(config).await;
    if let Some(reason) = server.state().init_error() {
        tracing::warn!("Serving without a RAG chain: {}", reason);
        tracing::warn!("Build the index first: docs-rag build");
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/chat   - Ask a question (SSE stream)");
    println!("  POST /api/query  - Ask a question (JSON)");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
