//! Ingestion: the write path from cleaned report text to the vector store.
//!
//! Retrieval never mutates the index; everything that writes lives here.
//! The pipeline chunks a document, embeds the chunk bodies in serially paced
//! batches, and upserts the results into a [`crate::stores::ChunkStore`].

mod pipeline;

pub use pipeline::{IngestReport, IngestionOptions, IngestionPipeline};
