//! Enrichment response shapes and output records.
//!
//! Response shapes derive `JsonSchema` so a strict schema can be sent with
//! each structured call; records keep the index and copy of their source.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a system needs to be able to do to answer a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Defining a term or concept
    Definition,
    /// Looking up a number, price, quantity or measurement
    NumericFact,
    /// Comparing two or more things
    Comparison,
    /// Describing steps or how to do something
    Procedure,
    /// Answering where something is
    Location,
    /// Identifying a person, organisation or named entity
    PersonOrEntity,
    /// Answering when something happened or how long it takes
    Temporal,
    /// Explaining causes or reasons
    Explanation,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Definition,
        Capability::NumericFact,
        Capability::Comparison,
        Capability::Procedure,
        Capability::Location,
        Capability::PersonOrEntity,
        Capability::Temporal,
        Capability::Explanation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Definition => "definition",
            Capability::NumericFact => "numeric_fact",
            Capability::Comparison => "comparison",
            Capability::Procedure => "procedure",
            Capability::Location => "location",
            Capability::PersonOrEntity => "person_or_entity",
            Capability::Temporal => "temporal",
            Capability::Explanation => "explanation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response shape for capability tagging.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CapabilityResponse {
    /// Capabilities required to answer the query.
    pub capabilities: Vec<Capability>,
}

/// A query tagged with capabilities and a topic-model label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedQuery {
    /// Position of the query in the submitted batch
    pub source_index: usize,
    pub query: String,

    /// De-duplicated, in the order the model returned them
    pub capabilities: Vec<Capability>,

    /// Label from the injected topic model
    pub topic: i64,
}

/// Closed category vocabulary for papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    #[serde(rename = "cs.AI")]
    ArtificialIntelligence,
    #[serde(rename = "cs.IR")]
    InformationRetrieval,
    #[serde(rename = "stat.ML")]
    MachineLearning,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::ArtificialIntelligence,
        Category::InformationRetrieval,
        Category::MachineLearning,
    ];

    /// Label as stored in the `category` metadata field.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ArtificialIntelligence => "cs.AI",
            Category::InformationRetrieval => "cs.IR",
            Category::MachineLearning => "stat.ML",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Response shape for category classification.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CategoryResponse {
    /// The single category the text belongs to.
    pub category: Category,
}

/// A hypothetical question and answer derived from a text chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionAnswer {
    /// The reasoning process leading to the answer and question being generated.
    pub chain_of_thought: String,

    /// The generated question from the text chunk.
    pub question: String,

    /// The answer to the generated question.
    pub answer: String,
}

/// Search metadata generated for a text chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// Keywords a user might use to search for this text.
    pub keywords: Vec<String>,

    /// Hypothetical phrases a user might use to search for this text.
    pub hypothetical_phrases: Vec<String>,
}

impl Metadata {
    /// Keywords joined for indexing as a single text field.
    pub fn keywords_text(&self) -> String {
        self.keywords.join(", ")
    }

    /// Hypothetical phrases joined for indexing as a single text field.
    pub fn search_queries_text(&self) -> String {
        self.hypothetical_phrases.join("\n")
    }
}

/// An enrichment output paired with the item it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enriched<S, R> {
    pub source_index: usize,
    pub source: S,
    pub response: R,
}

impl<S, R> Enriched<S, R> {
    pub fn new(source_index: usize, source: S, response: R) -> Self {
        Self {
            source_index,
            source,
            response,
        }
    }
}
