//! LLM prompts for the enrichment transforms.

use crate::types::enrichment::{Capability, Category};

pub const CAPABILITY_PROMPT: &str = "You are an advanced tagging system that excels at \
extracting what capabilities from the provided list need to be used in order to answer a \
user's query.";

pub const CATEGORY_PROMPT: &str = "You are a world class research librarian. You are about to \
be passed a query or a text chunk and your job is to pick the single subject category it \
belongs to from the provided list.";

pub const QUESTION_PROMPT: &str = "You are a world class search engine. You are about to be \
passed a text chunk and your job is to generate a hypothetical question and answer pair that \
a user might ask to search for in order to retrieve the text chunk. Make sure to use \
information that is unique to the text chunk itself and also explain any sort of \
information/acronym that you use in the answer.";

pub const CATEGORY_QUESTION_PROMPT: &str = "You are a world class question generator. You are \
about to be passed a text chunk. Your job is to generate a question and answer that will \
enable a user to find similar chunks. Make sure not to include the title of the text chunk \
within the question";

pub const METADATA_PROMPT: &str = "You are a world class query indexing system. You are about \
to be passed a text chunk and you'll need to generate some metadata that will allow you to \
retrieve this specific chunk when the user makes a relevant query";

/// User prompt for capability tagging, listing the vocabulary.
pub fn format_capability_prompt(query: &str) -> String {
    let vocabulary = Capability::ALL
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Capabilities:\n{}\n\nThe query is '{}'", vocabulary, query)
}

/// User prompt for category classification, listing the vocabulary.
pub fn format_category_prompt(text: &str) -> String {
    let vocabulary = Category::ALL
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Categories:\n{}\n\nClassify this text: {}", vocabulary, text)
}

pub fn format_chunk_prompt(text: &str) -> String {
    format!("Here is the text chunk : {}", text)
}

pub fn format_metadata_prompt(text: &str) -> String {
    format!("The text chunk is {}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_prompt_lists_vocabulary() {
        let prompt = format_capability_prompt("how tall is the eiffel tower");
        for capability in Capability::ALL {
            assert!(prompt.contains(capability.as_str()));
        }
        assert!(prompt.ends_with("The query is 'how tall is the eiffel tower'"));
    }

    #[test]
    fn test_category_prompt_lists_labels() {
        let prompt = format_category_prompt("BM25 ranking");
        assert!(prompt.contains("- cs.IR"));
        assert!(prompt.contains("- stat.ML"));
        assert!(prompt.contains("BM25 ranking"));
    }
}
