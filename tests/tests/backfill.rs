use ragline_foundation::rag::{BackfillEngine, InMemoryChunkStore, SqliteChunkStore};
use ragline_kernel::RagError;
use ragline_kernel::rag::{ChunkStore, DistanceMetric};
use ragline_testing::{FakeEmbeddingProvider, assert_called, pending_chunk, ready_chunk};
use std::sync::Arc;
use std::time::Duration;

const DIM: usize = 2;

async fn stores() -> Vec<(&'static str, Arc<dyn ChunkStore>)> {
    let sqlite = SqliteChunkStore::in_memory("chunks", DIM, DistanceMetric::L2)
        .await
        .unwrap();
    vec![
        ("memory", Arc::new(InMemoryChunkStore::new(DIM))),
        ("sqlite", Arc::new(sqlite)),
    ]
}

async fn seed(store: &Arc<dyn ChunkStore>) {
    store
        .insert(vec![
            pending_chunk("p1", "first pending", DIM),
            ready_chunk("r1", "already done", vec![7.0, 7.0]),
            pending_chunk("p2", "second pending", DIM),
        ])
        .await
        .unwrap();
}

async fn vector_of(store: &Arc<dyn ChunkStore>, id: &str) -> Vec<f32> {
    store
        .scan_all()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == id)
        .map(|r| r.vector)
        .unwrap()
}

#[tokio::test]
async fn only_pending_chunks_are_embedded() {
    for (name, store) in stores().await {
        seed(&store).await;
        let embedder = FakeEmbeddingProvider::new(DIM);
        let engine = BackfillEngine::new(store.clone(), Arc::new(embedder.clone()));

        let report = engine.backfill("embed-model", 8).await.unwrap();

        assert_eq!(report.updated_count(), 2, "{name}");
        assert!(report.failed.is_empty(), "{name}");
        let mut embedded = embedder.history().await;
        embedded.sort();
        assert_eq!(embedded, vec!["first pending", "second pending"], "{name}");
        assert_eq!(vector_of(&store, "r1").await, vec![7.0, 7.0], "{name}");
        assert_eq!(vector_of(&store, "p1").await, vec![13.0, 1.0], "{name}");
        assert!(store.scan_all().await.unwrap().iter().all(|r| r.is_ready()));
    }
}

#[tokio::test]
async fn second_run_is_a_noop() {
    for (name, store) in stores().await {
        seed(&store).await;
        let embedder = FakeEmbeddingProvider::new(DIM);
        let engine = BackfillEngine::new(store.clone(), Arc::new(embedder.clone()));

        engine.backfill("embed-model", 1).await.unwrap();
        let again = engine.backfill("embed-model", 1).await.unwrap();

        assert!(again.is_noop(), "{name}");
        assert_eq!(embedder.call_count().await, 2, "{name}");
    }
}

#[tokio::test]
async fn failed_chunk_stays_pending_until_the_next_run() {
    for (name, store) in stores().await {
        seed(&store).await;
        let embedder = FakeEmbeddingProvider::new(DIM);
        embedder.fail_on("second pending").await;
        let engine = BackfillEngine::new(store.clone(), Arc::new(embedder.clone()));

        let first = engine.backfill("embed-model", 2).await.unwrap();
        assert_eq!(first.succeeded, vec!["p1".to_string()], "{name}");
        assert_eq!(first.failed.len(), 1, "{name}");
        assert_eq!(first.failed[0].id, "p2", "{name}");
        assert!(first.failed[0].cause.contains("refused"), "{name}");

        let pending: Vec<_> = store
            .scan_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.is_pending())
            .map(|r| r.id)
            .collect();
        assert_eq!(pending, vec!["p2".to_string()], "{name}");

        embedder.recover("second pending").await;
        let second = engine.backfill("embed-model", 2).await.unwrap();
        assert_eq!(second.succeeded, vec!["p2".to_string()], "{name}");
        assert_called!(embedder, 3);
    }
}

#[tokio::test]
async fn wrong_vector_width_aborts_the_run() {
    for (name, store) in stores().await {
        seed(&store).await;
        let embedder = FakeEmbeddingProvider::new(DIM);
        embedder.set_vector("first pending", vec![1.0, 2.0, 3.0]).await;
        let engine = BackfillEngine::new(store.clone(), Arc::new(embedder));

        let err = engine.backfill("embed-model", 1).await.unwrap_err();

        assert!(
            matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }),
            "{name}: {err}"
        );
        assert!(err.is_configuration());
        assert_eq!(vector_of(&store, "p1").await, vec![0.0, 0.0], "{name}");
    }
}

#[tokio::test]
async fn zero_batch_size_is_rejected() {
    let store: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::new(DIM));
    let embedder = FakeEmbeddingProvider::new(DIM);
    let engine = BackfillEngine::new(store, Arc::new(embedder.clone()));

    let err = engine.backfill("embed-model", 0).await.unwrap_err();

    assert!(err.is_configuration());
    assert_called!(embedder, 0);
}

#[tokio::test]
async fn backfilled_chunks_become_searchable() {
    for (name, store) in stores().await {
        store
            .insert(vec![pending_chunk("p1", "abc", DIM)])
            .await
            .unwrap();
        assert!(store.search(&[3.0, 1.0], 5).await.unwrap().is_empty(), "{name}");

        let engine = BackfillEngine::new(
            store.clone(),
            Arc::new(FakeEmbeddingProvider::new(DIM)),
        );
        engine.backfill("embed-model", 4).await.unwrap();

        let hits = store.search(&[3.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1, "{name}");
        assert_eq!(hits[0].record.id, "p1", "{name}");
        assert!(hits[0].distance.abs() < 1e-6, "{name}");
    }
}

#[tokio::test]
async fn overlapping_runs_embed_each_chunk_once() {
    for (name, store) in stores().await {
        store
            .insert(vec![pending_chunk("p1", "slow text", DIM)])
            .await
            .unwrap();
        let embedder = FakeEmbeddingProvider::new(DIM);
        embedder.set_delay(Duration::from_millis(50)).await;
        let engine = BackfillEngine::new(store.clone(), Arc::new(embedder.clone()));

        let (first, second) = tokio::join!(
            engine.backfill("embed-model", 4),
            engine.backfill("embed-model", 4)
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.updated_count() + second.updated_count(), 1, "{name}");
        assert!(first.skipped.is_empty() && second.skipped.is_empty(), "{name}");
        assert_called!(embedder, 1);
        assert_eq!(vector_of(&store, "p1").await, vec![9.0, 1.0], "{name}");
    }
}

#[tokio::test]
async fn stale_write_never_overwrites_an_embedded_chunk() {
    for (name, store) in stores().await {
        store
            .insert(vec![pending_chunk("p1", "text", DIM)])
            .await
            .unwrap();

        assert!(store.update_vector("p1", vec![1.0, 2.0]).await.unwrap(), "{name}");
        assert!(!store.update_vector("p1", vec![3.0, 4.0]).await.unwrap(), "{name}");
        assert!(!store.update_vector("ghost", vec![3.0, 4.0]).await.unwrap(), "{name}");
        assert_eq!(vector_of(&store, "p1").await, vec![1.0, 2.0], "{name}");
    }
}
