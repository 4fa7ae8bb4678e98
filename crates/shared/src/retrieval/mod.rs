use std::sync::Arc;

use tracing::warn;

use crate::llm::embeddings::EmbeddingsClient;

mod similarity;
mod store;

pub use similarity::{RankedDoc, cosine_similarity, rank};
pub use store::{CorpusError, EmbeddingRecord, EmbeddingStore};

/// Per-request retrieval: embeds the query through the upstream API and
/// ranks the in-memory corpus against it. Never fails: an unavailable
/// embedding call or an empty corpus degrades to "no context".
#[derive(Clone)]
pub struct Retriever {
    store: Arc<EmbeddingStore>,
    embeddings: EmbeddingsClient,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<EmbeddingStore>, embeddings: EmbeddingsClient, top_k: usize) -> Self {
        Self {
            store,
            embeddings,
            top_k,
        }
    }

    pub fn enabled(&self) -> bool {
        !self.store.is_empty() && self.top_k > 0
    }

    pub fn corpus_size(&self) -> usize {
        self.store.len()
    }

    pub async fn retrieve(&self, query: &str) -> Vec<RankedDoc> {
        if !self.enabled() {
            return Vec::new();
        }

        let query_vector = match self.embeddings.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("query embedding failed, continuing without context: {err}");
                return Vec::new();
            }
        };

        let mut ranked = rank(self.store.records(), &query_vector);
        ranked.truncate(self.top_k);
        ranked
    }
}
