//! Topic-model side channel for capability tagging.

use std::collections::HashSet;

/// Assigns a topic label to a query. Pure and synchronous.
pub trait TopicModel: Send + Sync {
    fn topic(&self, text: &str) -> i64;
}

impl<F> TopicModel for F
where
    F: Fn(&str) -> i64 + Send + Sync,
{
    fn topic(&self, text: &str) -> i64 {
        self(text)
    }
}

/// Label used for text that matches no topic.
pub const OUTLIER_TOPIC: i64 = -1;

/// Keyword-overlap topic model.
///
/// Each topic is a keyword set; a query gets the index of the topic with
/// the most keyword hits (lowest index on ties), or [`OUTLIER_TOPIC`].
#[derive(Debug, Clone, Default)]
pub struct KeywordTopics {
    topics: Vec<HashSet<String>>,
}

impl KeywordTopics {
    pub fn new<T, K>(topics: T) -> Self
    where
        T: IntoIterator<Item = K>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            topics: topics
                .into_iter()
                .map(|words| words.into_iter().map(|w| w.as_ref().to_lowercase()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl TopicModel for KeywordTopics {
    fn topic(&self, text: &str) -> i64 {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut best = (0usize, OUTLIER_TOPIC);
        for (index, keywords) in self.topics.iter().enumerate() {
            let hits = words.iter().filter(|w| keywords.contains(*w)).count();
            if hits > best.0 {
                best = (hits, index as i64);
            }
        }
        best.1
    }
}
