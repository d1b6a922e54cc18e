//! Ingests a cleaned report text file into a SQLite vector store, then runs
//! a retrieval against it.
//!
//! Offline by design: embeddings and LLM calls use the mock providers, so the
//! demo exercises chunking, storage, and the retrieval pipeline without any
//! credentials.
//!
//! ```bash
//! cargo run --example ingest_and_query -- formatted_report.txt "What was the total energy consumed?"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tracing_subscriber::FmtSubscriber;

use brsr_rag::config::RetrievalConfig;
use brsr_rag::embeddings::{MockEmbeddingProvider, ProviderEmbeddingModel};
use brsr_rag::ingestion::{IngestionOptions, IngestionPipeline};
use brsr_rag::llm::MockCompletionProvider;
use brsr_rag::retrieval::{QueryRewriter, Reranker, RetrievalPipeline, VectorRetriever};
use brsr_rag::stores::{SqliteChunkStore, collection_path};
use brsr_rag::types::RagError;

const DEFAULT_CONFIG: &str = r#"
pipeline_logic:
  process_query: false
  use_reranking: false
retrieval:
  initial_k: 20
  final_k: 5
models:
  query_expansion_model: gpt-4.1-nano
  reranking_model: gpt-4.1-mini
vectorstore:
  collection_name: demo_reports
  embedding_model: mock-embedding
"#;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();

    let mut args = env::args().skip(1);
    let input = args
        .next()
        .ok_or_else(|| RagError::Io("usage: ingest_and_query <report.txt> [question]".into()))?;
    let question = args
        .next()
        .unwrap_or_else(|| "What was the total energy consumed?".to_string());

    let config = RetrievalConfig::from_yaml_str(DEFAULT_CONFIG)?;

    let db_dir = env::var("BRSR_DB_DIR").unwrap_or_else(|_| "./demo_db".to_string());
    let db_dir = PathBuf::from(db_dir);
    fs::create_dir_all(&db_dir).await?;

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let model = ProviderEmbeddingModel::new(embedder.clone());
    let store = SqliteChunkStore::open(
        collection_path(&db_dir, &config.vectorstore.collection_name),
        &model,
    )
    .await?;

    let source_name = PathBuf::from(&input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.clone());
    let raw_text = fs::read_to_string(&input).await?;

    let ingestion = IngestionPipeline::new(embedder.clone(), Arc::new(store.clone()))
        .with_options(IngestionOptions {
            pacing_delay: Duration::from_millis(200),
            export_path: Some(db_dir.join("chunks_preview.txt")),
            ..IngestionOptions::default()
        });

    let report = ingestion.ingest_document(&raw_text, &source_name).await?;
    println!(
        "Ingested {} chunks ({} table, {} narrative) in {} batches",
        report.chunks_total, report.table_chunks, report.narrative_chunks, report.embedding_batches
    );

    let completion = Arc::new(MockCompletionProvider::new());
    let retriever = VectorRetriever::new(embedder, Arc::new(store));
    let rewriter = QueryRewriter::new(completion.clone(), &config.models.query_expansion_model);
    let reranker = Reranker::new(completion, &config.models.reranking_model);
    let pipeline = RetrievalPipeline::new(retriever, rewriter, reranker, config);

    let (results, expanded) = pipeline.retrieve(&question, &[]).await?;
    println!("\nQuestion : {question}");
    println!("Expanded : {expanded}");
    println!("Results  : {}\n", results.len());
    for (rank, result) in results.iter().enumerate() {
        let page = result.page().unwrap_or_default();
        let preview: String = result.page_content.chars().take(100).collect();
        println!("{:>2}. [page {page}] {preview}…", rank + 1);
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
