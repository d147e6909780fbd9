//! Synthetic question/answer and metadata generation for passages.

use serde::{Deserialize, Serialize};

use crate::executor::BatchOutcome;
use crate::pipeline::prompts::{
    format_chunk_prompt, format_metadata_prompt, CATEGORY_QUESTION_PROMPT, METADATA_PROMPT,
    QUESTION_PROMPT,
};
use crate::pipeline::EnrichmentPipeline;
use crate::traits::ai::StructuredClient;
use crate::types::document::Document;
use crate::types::enrichment::{Enriched, Metadata, QuestionAnswer};

/// Flattened metadata ready to be indexed next to its passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub chunk_id: String,
    pub text: String,

    /// Keywords joined with `", "`
    pub keywords: String,

    /// Hypothetical phrases, one per line
    pub search_queries: String,
}

impl From<&Enriched<Document, Metadata>> for MetadataRecord {
    fn from(record: &Enriched<Document, Metadata>) -> Self {
        Self {
            chunk_id: record.source.chunk_id.clone(),
            text: record.source.text.clone(),
            keywords: record.response.keywords_text(),
            search_queries: record.response.search_queries_text(),
        }
    }
}

impl MetadataRecord {
    /// The passage with its generated metadata attached as fields.
    pub fn into_document(self) -> Document {
        Document::with_id(self.chunk_id, self.text)
            .with_field("keywords", self.keywords)
            .with_field("search_queries", self.search_queries)
    }
}

impl<C> EnrichmentPipeline<'_, C>
where
    C: StructuredClient + ?Sized,
{
    /// Generate a hypothetical question a user would ask to find each passage.
    pub async fn generate_questions(
        &self,
        passages: Vec<Document>,
    ) -> BatchOutcome<Enriched<Document, QuestionAnswer>> {
        self.enrich(
            passages,
            &self.models().synthesis,
            QUESTION_PROMPT,
            |doc: &Document| format_chunk_prompt(&doc.text),
        )
        .await
    }

    /// Generate questions that find similar papers without naming the title.
    ///
    /// The resulting records feed category-labelled ground truth.
    pub async fn generate_category_questions(
        &self,
        papers: Vec<Document>,
    ) -> BatchOutcome<Enriched<Document, QuestionAnswer>> {
        self.enrich(
            papers,
            &self.models().tagging,
            CATEGORY_QUESTION_PROMPT,
            |doc: &Document| format_chunk_prompt(&doc.text),
        )
        .await
    }

    /// Generate keyword and hypothetical-phrase metadata for each passage.
    pub async fn generate_metadata(
        &self,
        passages: Vec<Document>,
    ) -> BatchOutcome<Enriched<Document, Metadata>> {
        self.enrich(
            passages,
            &self.models().metadata,
            METADATA_PROMPT,
            |doc: &Document| format_metadata_prompt(&doc.text),
        )
        .await
    }
}
