//! Ground-truth artifacts: JSONL I/O and label generation.
//!
//! Label files hold one JSON object per line with at least a `query` and
//! the chunk id(s) that answer it:
//!
//! ```text
//! {"query": "...", "selected_chunk_ids": "3f2a..."}            single-label
//! {"query": "...", "selected_chunk_ids": ["3f2a...", "9bc1..."]} multi-label
//! {"query": "...", "category": "cs.IR", "chunk_id": "3f2a..."}  category questions
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{LabError, Result};
use crate::types::document::Document;
use crate::types::enrichment::{Enriched, QuestionAnswer};
use crate::types::query::{GroundTruth, LabeledQuery};

/// Read one `T` per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| LabError::Jsonl {
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    debug!(path = %path.as_ref().display(), count = items.len(), "Read JSONL");
    Ok(items)
}

/// Write one JSON object per line, replacing the file.
pub fn write_jsonl<T: Serialize>(path: impl AsRef<Path>, items: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), count = items.len(), "Labels saved");
    Ok(())
}

pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<LabeledQuery>> {
    read_jsonl(path)
}

pub fn save_labels(path: impl AsRef<Path>, labels: &[LabeledQuery]) -> Result<()> {
    write_jsonl(path, labels)
}

/// A candidate passage in a source dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePassage {
    pub text: String,
    #[serde(default)]
    pub is_selected: bool,
}

/// A dataset row: a query and its candidate passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub query: String,
    pub passages: Vec<SourcePassage>,
}

/// A query and the passages marked as answering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPassages {
    pub query: String,
    pub selected: Vec<Document>,
}

/// Split dataset rows into a de-duplicated corpus and per-query labels.
///
/// A passage text is added to the corpus the first time it appears. A
/// query keeps only selected passages seen for the first time in its own
/// row; queries left with none are dropped.
pub fn build_corpus(rows: Vec<SourceRow>) -> (Vec<Document>, Vec<QueryPassages>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut corpus = Vec::new();
    let mut labels = Vec::new();

    for row in rows {
        let mut selected = Vec::new();
        for passage in row.passages {
            if !seen.insert(passage.text.clone()) {
                continue;
            }
            let document = Document::new(passage.text);
            if passage.is_selected {
                selected.push(document.clone());
            }
            corpus.push(document);
        }
        if !selected.is_empty() {
            labels.push(QueryPassages {
                query: row.query,
                selected,
            });
        }
    }

    info!(passages = corpus.len(), queries = labels.len(), "Built corpus");
    (corpus, labels)
}

/// Turn query/passage rows into evaluation labels.
///
/// Single-label output has one row per selected passage; multi-label output
/// has one row per query listing every selected passage.
pub fn test_labels(rows: &[QueryPassages], single_label: bool) -> Vec<LabeledQuery> {
    if single_label {
        rows.iter()
            .flat_map(|row| {
                row.selected.iter().map(|doc| {
                    LabeledQuery::new(&row.query)
                        .with_ground_truth(GroundTruth::Single(doc.chunk_id.clone()))
                })
            })
            .collect()
    } else {
        rows.iter()
            .map(|row| {
                let ids = row.selected.iter().map(|doc| doc.chunk_id.clone()).collect();
                LabeledQuery::new(&row.query).with_ground_truth(GroundTruth::Many(ids))
            })
            .collect()
    }
}

/// Labels from generated category questions: the question is the query and
/// the source paper is the single relevant chunk.
pub fn category_test_labels(records: &[Enriched<Document, QuestionAnswer>]) -> Vec<LabeledQuery> {
    records
        .iter()
        .map(|record| {
            let label = LabeledQuery::new(&record.response.question)
                .with_ground_truth(GroundTruth::Single(record.source.chunk_id.clone()));
            match record.source.field("category") {
                Some(category) => label.with_category(category),
                None => label,
            }
        })
        .collect()
}
