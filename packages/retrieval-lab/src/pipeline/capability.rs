//! Capability tagging of queries.

use tracing::debug;

use crate::executor::BatchOutcome;
use crate::pipeline::prompts::{format_capability_prompt, CAPABILITY_PROMPT};
use crate::pipeline::EnrichmentPipeline;
use crate::traits::ai::StructuredClient;
use crate::traits::topic::TopicModel;
use crate::types::enrichment::{Capability, CapabilityResponse, TaggedQuery};

impl<C> EnrichmentPipeline<'_, C>
where
    C: StructuredClient + ?Sized,
{
    /// Tag each query with the capabilities needed to answer it.
    ///
    /// The topic label comes from `topic_model`, which runs locally and
    /// only for queries whose call succeeded.
    pub async fn tag_queries<T>(
        &self,
        queries: Vec<String>,
        topic_model: &T,
    ) -> BatchOutcome<TaggedQuery>
    where
        T: TopicModel + ?Sized,
    {
        debug!(queries = queries.len(), model = %self.models().tagging, "Tagging queries");

        self.enrich::<String, CapabilityResponse, _>(
            queries,
            &self.models().tagging,
            CAPABILITY_PROMPT,
            |query| format_capability_prompt(query),
        )
        .await
        .map(|_, record| TaggedQuery {
            source_index: record.source_index,
            topic: topic_model.topic(&record.source),
            capabilities: dedup(record.response.capabilities),
            query: record.source,
        })
    }
}

/// Drop repeated capabilities, keeping first occurrences in order.
fn dedup(capabilities: Vec<Capability>) -> Vec<Capability> {
    let mut seen = Vec::with_capacity(capabilities.len());
    for capability in capabilities {
        if !seen.contains(&capability) {
            seen.push(capability);
        }
    }
    seen
}
