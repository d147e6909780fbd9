//! End-to-end evaluation: corpus building, ingest, strategies and scoring.

use retrieval_lab::labels::{build_corpus, load_labels, save_labels, test_labels, SourcePassage, SourceRow};
use retrieval_lab::testing::{MockClient, MockEmbedder, MockReranker};
use retrieval_lab::{
    Cutoffs, Document, EnrichmentPipeline, EvalConfig, Evaluation, ExecutorConfig, LabError,
    MemoryStore, Metric, RetryBudget, Retriever, SearchConfig, Strategy, ThrottledExecutor,
};
use serde_json::json;
use std::sync::Arc;

const TOKIO: &str = "The tokio runtime uses a work stealing scheduler";
const BM25: &str = "BM25 is a ranking function used by search engines";
const BORROW: &str = "The borrow checker enforces lifetimes";
const FILLER: &str = "Cargo downloads crates from a registry";

fn rows() -> Vec<SourceRow> {
    let passage = |text: &str, is_selected: bool| SourcePassage {
        text: text.to_string(),
        is_selected,
    };
    vec![
        SourceRow {
            query: "tokio runtime scheduler".into(),
            passages: vec![passage(TOKIO, true), passage(FILLER, false)],
        },
        SourceRow {
            query: "bm25 ranking function".into(),
            passages: vec![passage(BM25, true), passage(FILLER, false)],
        },
        SourceRow {
            query: "borrow checker".into(),
            passages: vec![passage(BORROW, true)],
        },
    ]
}

/// Each passage and its query share one axis, so cosine ranks the
/// labelled passage first.
fn axis_embedder() -> MockEmbedder {
    let axis = |i: usize| {
        let mut v = vec![0.0; 4];
        v[i] = 1.0;
        v
    };
    MockEmbedder::new(4)
        .with_embedding(TOKIO, axis(0))
        .with_embedding("tokio runtime scheduler", axis(0))
        .with_embedding(BM25, axis(1))
        .with_embedding("bm25 ranking function", axis(1))
        .with_embedding(BORROW, axis(2))
        .with_embedding("borrow checker", axis(2))
        .with_embedding(FILLER, axis(3))
}

#[tokio::test]
async fn test_full_evaluation_over_built_corpus() {
    let (corpus, labelled) = build_corpus(rows());
    assert_eq!(corpus.len(), 4);
    assert_eq!(labelled.len(), 3);

    let embedder = axis_embedder();
    let store = MemoryStore::new();
    let added = store.ingest("passages", corpus, &embedder, 2).await.unwrap();
    assert_eq!(added, 4);
    assert_eq!(embedder.batch_sizes(), vec![2, 2]);

    // Labels survive a JSONL round trip.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.jsonl");
    save_labels(&path, &test_labels(&labelled, false)).unwrap();
    let queries = load_labels(&path).unwrap();
    assert_eq!(queries.len(), 3);

    let retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();
    let evaluation = Evaluation::new(
        EvalConfig::default().with_cutoffs(Cutoffs::new([1, 3]).unwrap()),
    )
    .unwrap()
    .with_strategies([
        Strategy::FullText,
        Strategy::Semantic,
        Strategy::Hybrid,
        Strategy::linear_combination(0.5).unwrap(),
        Strategy::rerank(Arc::new(MockReranker::new())),
    ]);

    let report = evaluation.run(&retriever, &queries).await.unwrap();

    let names: Vec<&str> = report.strategies.iter().map(|s| s.strategy.as_str()).collect();
    assert_eq!(
        names,
        vec!["fts", "vector", "hybrid", "linear_combination(0.50)", "rerank(mock_reverse)"]
    );
    for strategy in &report.strategies {
        assert_eq!(strategy.queries, 3);
        assert_eq!(strategy.per_query.len(), 3);
        for (_, value) in strategy.mean.iter() {
            assert!((0.0..=1.0).contains(value));
        }
    }

    let fts = report.strategy("fts").unwrap();
    assert_eq!(fts.mean.get(Metric::Recall, 3), Some(1.0));
    assert_eq!(fts.mean.get(Metric::Mrr, 1), Some(1.0));

    let vector = report.strategy("vector").unwrap();
    assert_eq!(vector.mean.get(Metric::Mrr, 3), Some(1.0));
    assert_eq!(vector.mean.get(Metric::Precision, 1), Some(1.0));

    let table = report.render_table();
    assert!(table.contains("recall@3"));
    assert!(table.contains("rerank(mock_reverse)"));
}

#[test]
fn test_single_label_rows_score_independently() {
    let (_, labelled) = build_corpus(vec![SourceRow {
        query: "tokio scheduler".into(),
        passages: vec![
            SourcePassage { text: TOKIO.into(), is_selected: true },
            SourcePassage { text: FILLER.into(), is_selected: true },
        ],
    }]);

    let single = test_labels(&labelled, true);
    let multi = test_labels(&labelled, false);
    assert_eq!(single.len(), 2);
    assert_eq!(multi.len(), 1);
    assert_eq!(multi[0].ground_truth.as_ref().map(|t| t.ids().len()), Some(2));
}

#[tokio::test]
async fn test_category_filtered_strategy() {
    let store = MemoryStore::new();
    store
        .insert_documents(
            "passages",
            vec![
                Document::with_id("ir", "ranking passages for search").with_field("category", "cs.IR"),
                Document::with_id("ml", "ranking losses for gradient boosting")
                    .with_field("category", "stat.ML"),
            ],
        )
        .unwrap();
    let embedder = MockEmbedder::default();

    let client = MockClient::new()
        .with_response("search ranking", json!({ "category": "cs.IR" }))
        .with_response("boosting ranking", json!({ "category": "stat.ML" }));
    let executor =
        ThrottledExecutor::new(&ExecutorConfig::new(2).with_retry(RetryBudget::immediate(2)))
            .unwrap();
    let pipeline = EnrichmentPipeline::new(&client, &executor);

    let queries = vec!["search ranking".to_string(), "boosting ranking".to_string()];
    let mut retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

    let err = retriever
        .search(&Strategy::CategoryFiltered, &queries, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, LabError::Unclassified(ref q) if q == "search ranking"));

    assert_eq!(retriever.classify_queries(&pipeline, &queries).await.unwrap(), 2);
    // Known queries are not classified again.
    assert_eq!(retriever.classify_queries(&pipeline, &queries).await.unwrap(), 0);
    assert_eq!(client.calls().len(), 2);

    let results = retriever
        .search(&Strategy::CategoryFiltered, &queries, 5)
        .await
        .unwrap();
    assert_eq!(results[0].ids(), ["ir".to_string()]);
    assert_eq!(results[1].ids(), ["ml".to_string()]);
}

#[tokio::test]
async fn test_classification_failure_fails_the_call() {
    let store = MemoryStore::new();
    let embedder = MockEmbedder::default();
    let client = MockClient::new();
    let executor =
        ThrottledExecutor::new(&ExecutorConfig::new(1).with_retry(RetryBudget::immediate(2)))
            .unwrap();
    let pipeline = EnrichmentPipeline::new(&client, &executor);
    let mut retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

    let err = retriever
        .classify_queries(&pipeline, &["unknown topic".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, LabError::PartialBatch(_)));
    assert_eq!(retriever.query_category("unknown topic"), None);
}
