//! Category classification against the closed category vocabulary.

use crate::executor::BatchOutcome;
use crate::pipeline::prompts::{format_category_prompt, CATEGORY_PROMPT};
use crate::pipeline::EnrichmentPipeline;
use crate::traits::ai::StructuredClient;
use crate::types::document::Document;
use crate::types::enrichment::{Category, CategoryResponse, Enriched};

impl<C> EnrichmentPipeline<'_, C>
where
    C: StructuredClient + ?Sized,
{
    /// Assign exactly one category to each item, rendered by `text`.
    pub async fn classify<S, P>(&self, items: Vec<S>, text: P) -> BatchOutcome<Enriched<S, Category>>
    where
        S: Clone,
        P: Fn(&S) -> String,
    {
        self.enrich::<S, CategoryResponse, _>(
            items,
            &self.models().tagging,
            CATEGORY_PROMPT,
            |item| format_category_prompt(&text(item)),
        )
        .await
        .map(|_, record| Enriched::new(record.source_index, record.source, record.response.category))
    }

    pub async fn classify_queries(&self, queries: Vec<String>) -> BatchOutcome<Enriched<String, Category>> {
        self.classify(queries, |query| query.clone()).await
    }

    pub async fn classify_documents(
        &self,
        documents: Vec<Document>,
    ) -> BatchOutcome<Enriched<Document, Category>> {
        self.classify(documents, |doc| doc.text.clone()).await
    }
}
