//! Retriever Integration Tests
//!
//! Exercise the full build/load/search lifecycle against in-memory and
//! on-disk sources and snapshot stores, with deterministic mock embedders:
//! - Snapshot load, fallback and persistence
//! - Bank filtering and over-fetch behavior
//! - Failure handling at the retriever boundary
//! - Searches served during a rebuild

mod common;

use bankiq::rag::embeddings::{EmbeddingProvider, EmbeddingService};
use bankiq::rag::retriever::{FilingIndex, Retriever, RetrieverSettings};
use bankiq::rag::snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
use bankiq::rag::source::{DocumentSource, FilesystemSource, MemorySource};
use bankiq::types::{Document, RetrieverStatus};
use bankiq_vector::IndexConfig;
use common::filing;
use common::mocks::{
    MockCountingEmbedder, MockFailingEmbedder, MockKeywordEmbedder, MockReadOnlySnapshotStore,
};
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;

// ============= Helpers =============

fn keywords() -> MockKeywordEmbedder {
    MockKeywordEmbedder::new(&["risk", "capital", "liquidity", "deposit"])
}

/// 3 ACME BANK filings and 2 OTHER BANK filings, 3 chunks each
fn corpus() -> Vec<Document> {
    vec![
        filing("ACME BANK", "2024", "acme-1.txt", "Credit risk rose as capital buffers thinned.", 1200),
        filing("ACME BANK", "2023", "acme-2.txt", "Liquidity risk is monitored daily.", 1200),
        filing("ACME BANK", "2024", "acme-3.txt", "Deposit growth slowed in the quarter.", 1200),
        filing("OTHER BANK", "2024", "other-1.txt", "Market risk and operational risk dominate.", 1200),
        filing("OTHER BANK", "2023", "other-2.txt", "Capital ratios remain strong.", 1200),
    ]
}

fn retriever_with(
    provider: Arc<dyn EmbeddingProvider>,
    documents: Vec<Document>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
) -> Retriever {
    Retriever::new(
        RetrieverSettings::default(),
        EmbeddingService::new(provider),
        Arc::new(MemorySource::new(documents)),
        snapshots,
    )
}

fn retriever(
    documents: Vec<Document>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
) -> Retriever {
    retriever_with(Arc::new(keywords()), documents, snapshots)
}

async fn ready_retriever() -> Retriever {
    let r = retriever(corpus(), None);
    assert!(r.initialize().await);
    r
}

// ============= Scenario A: filtered search =============

#[tokio::test]
async fn test_filtered_search_returns_only_matching_bank() {
    let r = ready_retriever().await;

    let results = r.search("risk", Some("ACME"), 5).await;

    assert!(!results.is_empty());
    assert!(results.len() <= 5);
    assert!(results.iter().all(|c| c.metadata.bank == "ACME BANK"));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_results_carry_content_and_metadata() {
    let r = ready_retriever().await;

    let results = r.search("liquidity", None, 1).await;
    assert_eq!(results.len(), 1);

    let top = &results[0];
    assert_eq!(top.metadata.file, "acme-2.txt");
    assert_eq!(top.metadata.year, "2023");
    assert_eq!(top.metadata.filing_type, "10-K");
    assert!(top.metadata.chunk_id < 3);
    assert!(top.content.contains("Liquidity risk"));
}

// ============= Filtering law =============

#[rstest]
#[case("ACME")]
#[case("acme")]
#[case("me b")]
#[case("BANK")]
#[case("other")]
#[case("NOPE")]
#[case(" ")]
#[tokio::test]
async fn test_filter_law(#[case] filter: &str) {
    let r = ready_retriever().await;

    let results = r.search("risk capital", Some(filter), 10).await;

    let needle = filter.to_uppercase();
    for chunk in &results {
        assert!(
            chunk.metadata.bank.to_uppercase().contains(&needle),
            "{} does not contain {}",
            chunk.metadata.bank,
            filter
        );
    }
    if needle == "NOPE" {
        assert!(results.is_empty());
    }
}

#[tokio::test]
async fn test_no_filter_applies_no_filtering() {
    let r = ready_retriever().await;

    let results = r.search("risk", None, 15).await;
    assert_eq!(results.len(), 15);
    assert!(results.iter().any(|c| c.metadata.bank == "ACME BANK"));
    assert!(results.iter().any(|c| c.metadata.bank == "OTHER BANK"));
}

#[tokio::test]
async fn test_filter_never_pads_beyond_overfetch_window() {
    // Ten risk-heavy OTHER BANK filings crowd the top candidates
    let mut documents: Vec<Document> = (0..10)
        .map(|i| {
            filing(
                "OTHER BANK",
                "2024",
                &format!("other-{}.txt", i),
                "Risk risk risk everywhere.",
                1200,
            )
        })
        .collect();
    documents.push(filing("ACME BANK", "2024", "acme.txt", "Deposit growth, little risk.", 1200));

    let r = retriever(documents, None);
    assert!(r.initialize().await);

    // k = 2 over-fetches 6 candidates, all OTHER BANK
    assert!(r.search("risk", Some("ACME"), 2).await.is_empty());

    // A wide enough window reaches the ACME chunks
    let wide = r.search("risk", Some("ACME"), 11).await;
    assert_eq!(wide.len(), 3);
    assert!(wide.iter().all(|c| c.metadata.bank == "ACME BANK"));
}

// ============= Boundary and determinism =============

#[tokio::test]
async fn test_k_larger_than_index_returns_everything_ranked() {
    let r = retriever(corpus()[..2].to_vec(), None);
    assert!(r.initialize().await);

    let results = r.search("risk", None, 50).await;
    assert_eq!(results.len(), 6);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let r = ready_retriever().await;

    let first = r.search("capital liquidity", None, 7).await;
    let second = r.search("capital liquidity", None, 7).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_zero_k_and_blank_query_filter() {
    let r = ready_retriever().await;
    assert!(r.search("risk", Some("ACME"), 0).await.is_empty());
    assert_eq!(
        r.search("risk", Some(""), 4).await,
        r.search("risk", None, 4).await
    );
}

// ============= Snapshots =============

#[tokio::test]
async fn test_snapshot_round_trip_preserves_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.bqvx");

    let builder = retriever(
        corpus(),
        Some(Arc::new(FileSnapshotStore::new(&path))),
    );
    assert!(builder.initialize().await);
    assert!(path.exists());

    // Empty source: the only way to become ready is the snapshot
    let loader = retriever(Vec::new(), Some(Arc::new(FileSnapshotStore::new(&path))));
    assert!(loader.initialize().await);
    assert_eq!(loader.status(), RetrieverStatus::Ready { entries: 15 });

    for query in ["risk", "capital", "deposit growth"] {
        assert_eq!(
            builder.search(query, None, 10).await,
            loader.search(query, None, 10).await
        );
    }
}

// Scenario C
#[tokio::test]
async fn test_corrupt_snapshot_falls_back_to_rebuild() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.bqvx");

    let builder = retriever(corpus(), Some(Arc::new(FileSnapshotStore::new(&path))));
    assert!(builder.initialize().await);

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        FilingIndex::load(&path).await,
        Err(bankiq_vector::Error::Corrupt(_))
    ));

    let provider = Arc::new(MockCountingEmbedder::new(Arc::new(keywords())));
    let r = retriever_with(
        provider.clone(),
        corpus(),
        Some(Arc::new(FileSnapshotStore::new(&path))),
    );
    assert!(r.initialize().await);
    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 15 });
    assert_eq!(provider.calls(), 15);

    // The rebuilt index replaced the damaged snapshot
    assert_eq!(FilingIndex::load(&path).await.unwrap().len(), 15);
}

#[tokio::test]
async fn test_garbage_snapshot_rebuilds() {
    let store = Arc::new(MemorySnapshotStore::with_bytes(b"not a snapshot".to_vec()));
    let r = retriever(corpus(), Some(store.clone()));

    assert!(r.initialize().await);
    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 15 });
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_empty_snapshot_is_treated_as_stale() {
    let empty: FilingIndex = FilingIndex::new(IndexConfig::default());
    let store = Arc::new(MemorySnapshotStore::with_bytes(empty.to_bytes().unwrap()));

    let r = retriever(corpus(), Some(store.clone()));
    assert!(r.initialize().await);
    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 15 });
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_snapshot_with_other_dimensionality_is_rebuilt() {
    let store = Arc::new(MemorySnapshotStore::new());
    assert!(retriever(corpus(), Some(store.clone())).initialize().await);

    // A two-keyword model produces 3-dimensional embeddings
    let small = MockKeywordEmbedder::new(&["risk", "capital"]);
    let r = Retriever::new(
        RetrieverSettings::default(),
        EmbeddingService::new(Arc::new(small)).with_dimensions(3),
        Arc::new(MemorySource::new(corpus())),
        Some(store.clone()),
    );
    assert!(r.initialize().await);
    assert_eq!(r.index().unwrap().dimensions(), Some(3));
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_snapshot_write_failure_still_ready() {
    let r = retriever(corpus(), Some(Arc::new(MockReadOnlySnapshotStore)));
    assert!(r.initialize().await);
    assert!(!r.search("risk", None, 3).await.is_empty());
}

#[tokio::test]
async fn test_rebuild_ignores_snapshot_and_overwrites_it() {
    let store = Arc::new(MemorySnapshotStore::new());
    let source = Arc::new(MemorySource::new(corpus()));
    let r = Retriever::new(
        RetrieverSettings::default(),
        EmbeddingService::new(Arc::new(keywords())),
        source.clone(),
        Some(store.clone()),
    );
    assert!(r.initialize().await);

    source.push(filing("NEW BANK", "2025", "new.txt", "Capital plan approved.", 1200));
    assert!(r.rebuild().await);

    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 18 });
    assert_eq!(store.write_count(), 2);
    assert!(!r.search("capital", Some("new"), 3).await.is_empty());
}

// ============= Failure handling =============

#[tokio::test]
async fn test_embedding_failure_fails_initialize() {
    let r = retriever_with(Arc::new(MockFailingEmbedder), corpus(), None);

    assert!(!r.initialize().await);
    assert!(matches!(r.status(), RetrieverStatus::Failed { .. }));
    assert!(r.search("risk", None, 5).await.is_empty());
}

#[tokio::test]
async fn test_failure_mid_build_fails_whole_build() {
    let provider = Arc::new(MockCountingEmbedder::failing_after(Arc::new(keywords()), 12));
    let store = Arc::new(MemorySnapshotStore::new());
    let r = retriever_with(provider.clone(), corpus(), Some(store.clone()));

    assert!(!r.initialize().await);
    assert!(r.index().is_none());
    assert_eq!(store.write_count(), 0);
    // Stopped at the first failing call
    assert_eq!(provider.calls(), 13);
}

#[tokio::test]
async fn test_failed_is_terminal_until_rebuild() {
    let provider = Arc::new(MockCountingEmbedder::failing_after(Arc::new(keywords()), 0));
    let r = retriever_with(provider.clone(), corpus(), None);

    assert!(!r.initialize().await);
    assert!(!r.initialize().await);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_query_embedding_failure_yields_empty() {
    // 15 successful calls cover the build; the query is the 16th
    let provider = Arc::new(MockCountingEmbedder::failing_after(Arc::new(keywords()), 15));
    let r = retriever_with(provider, corpus(), None);

    assert!(r.initialize().await);
    assert!(r.search("risk", None, 5).await.is_empty());
    assert!(r.status().is_ready());
}

#[tokio::test]
async fn test_initialize_after_ready_does_no_work() {
    let provider = Arc::new(MockCountingEmbedder::new(Arc::new(keywords())));
    let r = retriever_with(provider.clone(), corpus(), None);

    assert!(r.initialize().await);
    assert!(r.initialize().await);
    assert_eq!(provider.calls(), 15);
}

// ============= Filesystem source =============

#[tokio::test]
async fn test_build_from_filing_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("filings");
    for doc in corpus() {
        let folder = root.join(&doc.bank).join(&doc.year).join(&doc.filing_type);
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(&doc.file), &doc.text).unwrap();
    }
    // Older than the cutoff
    let old = root.join("ACME BANK/2019/10-K");
    std::fs::create_dir_all(&old).unwrap();
    std::fs::write(old.join("old.txt"), "risk ".repeat(400)).unwrap();

    let source: Arc<dyn DocumentSource> = Arc::new(FilesystemSource::new(&root).with_min_year(2023));
    let r = Retriever::new(
        RetrieverSettings::default(),
        EmbeddingService::new(Arc::new(keywords())),
        source,
        None,
    );

    assert!(r.initialize().await);
    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 15 });
    let results = r.search("risk", None, 15).await;
    assert!(results.iter().all(|c| c.metadata.year != "2019"));
}

#[tokio::test]
async fn test_missing_filing_tree_fails() {
    let source: Arc<dyn DocumentSource> =
        Arc::new(FilesystemSource::new("/nonexistent/bankiq/filings"));
    let r = Retriever::new(
        RetrieverSettings::default(),
        EmbeddingService::new(Arc::new(keywords())),
        source,
        None,
    );

    assert!(!r.initialize().await);
    match r.status() {
        RetrieverStatus::Failed { reason } => assert!(reason.contains("Source unavailable")),
        other => panic!("Expected Failed, got {:?}", other),
    }
}

// ============= Concurrency =============

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_searches_served_during_rebuild() {
    let r = Arc::new(ready_retriever().await);

    let rebuild = {
        let r = Arc::clone(&r);
        tokio::spawn(async move { r.rebuild().await })
    };

    let searches: Vec<_> = (0..16)
        .map(|_| {
            let r = Arc::clone(&r);
            tokio::spawn(async move { r.search("capital", None, 3).await })
        })
        .collect();

    for handle in searches {
        assert_eq!(handle.await.unwrap().len(), 3);
    }
    assert!(rebuild.await.unwrap());
    assert_eq!(r.status(), RetrieverStatus::Ready { entries: 15 });
}
