//! In-memory vector store for tests, notebooks-scale corpora and the CLI.
//!
//! Lexical search is BM25, vector search is cosine similarity and hybrid
//! search fuses the two with RRF unless a reranker is supplied.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

use crate::error::{LabError, Result};
use crate::stores::fusion::{fuse_hits, sort_by_score};
use crate::stores::lexical::LexicalIndex;
use crate::traits::ai::Embedder;
use crate::traits::store::{
    cosine_similarity, Filter, SearchHit, SearchQuery, SearchRequest, VectorStore,
};
use crate::types::document::Document;

#[derive(Debug, Clone)]
struct StoredPassage {
    document: Document,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Default)]
struct Table {
    passages: Vec<StoredPassage>,
    positions: HashMap<String, usize>,
    index: LexicalIndex,
}

impl Table {
    fn upsert(&mut self, document: Document, embedding: Option<Vec<f32>>) -> bool {
        let passage = StoredPassage {
            document,
            embedding,
        };
        match self.positions.get(&passage.document.chunk_id) {
            Some(&pos) => {
                self.passages[pos] = passage;
                false
            }
            None => {
                self.positions
                    .insert(passage.document.chunk_id.clone(), self.passages.len());
                self.index.add(&passage.document.text);
                self.passages.push(passage);
                true
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index = LexicalIndex::build(self.passages.iter().map(|p| p.document.text.as_str()));
    }

    fn admitted<'a>(
        &'a self,
        filter: Option<&'a Filter>,
    ) -> impl Iterator<Item = (usize, &'a StoredPassage)> + 'a {
        self.passages
            .iter()
            .enumerate()
            .filter(move |(_, p)| filter.map_or(true, |f| f.matches(&p.document.metadata)))
    }

    fn lexical(&self, text: &str, filter: Option<&Filter>, limit: usize) -> Vec<SearchHit> {
        let terms = LexicalIndex::query_terms(text);
        let mut hits: Vec<SearchHit> = self
            .admitted(filter)
            .filter_map(|(pos, p)| {
                let score = self.index.score(pos, &terms);
                (score > 0.0).then(|| SearchHit {
                    chunk_id: p.document.chunk_id.clone(),
                    text: p.document.text.clone(),
                    score,
                    lexical_score: Some(score),
                    vector_score: None,
                })
            })
            .collect();
        sort_by_score(&mut hits);
        hits.truncate(limit);
        hits
    }

    fn vector(&self, query: &[f32], filter: Option<&Filter>, limit: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .admitted(filter)
            .filter_map(|(_, p)| {
                p.embedding.as_ref().map(|embedding| {
                    let score = cosine_similarity(query, embedding);
                    SearchHit {
                        chunk_id: p.document.chunk_id.clone(),
                        text: p.document.text.clone(),
                        score,
                        lexical_score: None,
                        vector_score: Some(score),
                    }
                })
            })
            .collect();
        sort_by_score(&mut hits);
        hits.truncate(limit);
        hits
    }
}

/// In-memory tables of passages with optional embeddings.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace passages (keyed by chunk id). Returns how many were new.
    pub fn insert(
        &self,
        table: &str,
        rows: impl IntoIterator<Item = (Document, Option<Vec<f32>>)>,
    ) -> Result<usize> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| LabError::Store("table lock poisoned".into()))?;
        let table = tables.entry(table.to_string()).or_default();

        let mut added = 0;
        let mut replaced = false;
        for (document, embedding) in rows {
            if table.upsert(document, embedding) {
                added += 1;
            } else {
                replaced = true;
            }
        }
        if replaced {
            table.rebuild_index();
        }
        Ok(added)
    }

    /// Insert documents without embeddings (lexical search only).
    pub fn insert_documents(&self, table: &str, documents: Vec<Document>) -> Result<usize> {
        self.insert(table, documents.into_iter().map(|d| (d, None)))
    }

    /// Embed documents in batches and insert them.
    pub async fn ingest<E: Embedder + ?Sized>(
        &self,
        table: &str,
        documents: Vec<Document>,
        embedder: &E,
        batch_size: usize,
    ) -> Result<usize> {
        let mut added = 0;
        for batch in documents.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(LabError::Store(format!(
                    "embedder returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                )));
            }
            added += self.insert(table, batch.iter().cloned().zip(embeddings.into_iter().map(Some)))?;
            debug!(table, added, "Inserted batch");
        }
        info!(table, added, total = documents.len(), "Ingest complete");
        Ok(added)
    }

    /// Number of passages in a table (0 when the table does not exist).
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map_or(0, |t| t.passages.len()))
            .unwrap_or(0)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Run the index-side part of a search. Hybrid returns fused candidates.
    fn candidates(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| LabError::Store("table lock poisoned".into()))?;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| LabError::UnknownTable(request.table.clone()))?;
        let filter = request.filter.as_ref();

        let hits = match &request.query {
            SearchQuery::Text(text) => table.lexical(text, filter, request.limit),
            SearchQuery::Vector(vector) => table.vector(vector, filter, request.limit),
            SearchQuery::Hybrid { text, vector } => fuse_hits(
                table.lexical(text, filter, request.limit),
                table.vector(vector, filter, request.limit),
            ),
        };
        Ok(hits)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let mut hits = self.candidates(request)?;

        if let (Some(reranker), SearchQuery::Hybrid { text, .. }) = (&request.reranker, &request.query) {
            hits = reranker.rerank(text, hits).await?;
        }

        hits.truncate(request.limit);
        debug!(request = ?request, hits = hits.len(), "Search complete");
        Ok(hits)
    }
}
