//! Multi-stage retrieval.
//!
//! ```text
//! question ──► rewrite (best-effort) ──► [original, rewritten]
//!                                              │
//!                       VectorRetriever (embed ► index ► zip)  ×N queries
//!                                              │
//!                                    merge (dedup, first-seen order)
//!                                              │
//!                                    rerank (best-effort) ──► final_k
//! ```
//!
//! The vector search is the only hard dependency: rewrite and rerank degrade
//! to the original question and the original order respectively, so a
//! retrieval call either returns ranked context or fails because no
//! candidates could be produced at all.

mod engine;
mod merge;
mod pipeline;
mod rerank;
mod result;
mod rewrite;

pub use engine::VectorRetriever;
pub use merge::merge_results;
pub use pipeline::{NO_EXPANSION_PLACEHOLDER, RetrievalPipeline};
pub use rerank::Reranker;
pub use result::RetrievedResult;
pub use rewrite::QueryRewriter;
