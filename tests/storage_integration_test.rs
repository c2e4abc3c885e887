//! SQLite-backed storage: chunk store, RAG indexing and the todo repository.

mod common;

use std::sync::Arc;

use aide::adapters::embeddings::HashingEmbeddingProvider;
use aide::adapters::sqlite::{initialize_database, SqliteChunkStore, SqliteTodoRepository};
use aide::domain::models::{
    Chunk, Document, EmbeddedChunk, SearchFilter, Todo, TodoFilter, TodoPriority, TodoStatus,
};
use aide::domain::ports::{ChunkStore, EmbeddingProvider, TaskTaggingTools, TodoRepository};
use aide::DomainError;
use tempfile::TempDir;

fn embedded(document: &Document, index: usize, content: &str, embedding: Vec<f32>) -> EmbeddedChunk {
    EmbeddedChunk {
        chunk: Chunk::new(&document.id, content.to_string(), index, index * 100, index * 100 + content.len()),
        embedding,
    }
}

#[tokio::test]
async fn test_chunk_store_ranks_by_cosine_and_filters_namespace() {
    let pool = common::setup_test_db().await;
    let store = SqliteChunkStore::new(pool);

    let work = Document::new("work", "Work doc", None);
    let home = Document::new("home", "Home doc", None);
    store
        .upsert_document(
            &work,
            &[
                embedded(&work, 0, "exact", vec![1.0, 0.0, 0.0]),
                embedded(&work, 1, "close", vec![0.9, 0.1, 0.0]),
                embedded(&work, 2, "opposite", vec![-1.0, 0.0, 0.0]),
            ],
        )
        .await
        .unwrap();
    store
        .upsert_document(&home, &[embedded(&home, 0, "home exact", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    let all = store.search(&[1.0, 0.0, 0.0], &SearchFilter::default(), 10).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(all.last().unwrap().content, "opposite");

    let work_only = store
        .search(&[1.0, 0.0, 0.0], &SearchFilter::namespace("work").with_min_score(0.5), 10)
        .await
        .unwrap();
    let contents: Vec<&str> = work_only.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["exact", "close"]);

    assert!(store.search(&[1.0, 0.0, 0.0], &SearchFilter::default(), 0).await.unwrap().is_empty());
    assert_eq!(store.count_chunks().await.unwrap(), 4);
}

#[tokio::test]
async fn test_upsert_replaces_chunks_and_delete_cascades() {
    let pool = common::setup_test_db().await;
    let store = SqliteChunkStore::new(pool);

    let mut doc = Document::new("default", "Notes", Some("notes.md".to_string()));
    store
        .upsert_document(&doc, &[embedded(&doc, 0, "a", vec![1.0]), embedded(&doc, 1, "b", vec![1.0])])
        .await
        .unwrap();
    doc.title = "Notes v2".to_string();
    store.upsert_document(&doc, &[embedded(&doc, 0, "c", vec![1.0])]).await.unwrap();

    let stored = store.get_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Notes v2");
    assert_eq!(stored.chunk_count, 1);
    assert_eq!(store.count_chunks().await.unwrap(), 1);
    assert_eq!(store.find_by_source("default", "notes.md").await.unwrap(), Some(doc.id.clone()));
    assert_eq!(store.find_by_source("other", "notes.md").await.unwrap(), None);

    assert!(store.delete_document(&doc.id).await.unwrap());
    assert!(!store.delete_document(&doc.id).await.unwrap());
    assert_eq!(store.count_chunks().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_rejects_foreign_chunks() {
    let pool = common::setup_test_db().await;
    let store = SqliteChunkStore::new(pool);
    let doc = Document::new("default", "A", None);
    let other = Document::new("default", "B", None);

    let err = store
        .upsert_document(&doc, &[embedded(&other, 0, "stray", vec![1.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationFailed(_)));
    assert!(store.get_document(&doc.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rag_reindexing_same_source_keeps_one_document() {
    let pool = common::setup_test_db().await;
    let rag = common::rag_service(&pool, 80, 10);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plants.md");

    std::fs::write(&path, "# Plants\n\nFerns like shade and humid air.").unwrap();
    let first = rag.index_file("garden", &path).await.unwrap();
    assert_eq!(first.title, "Plants");

    std::fs::write(&path, "# Plants\n\nFerns like shade. Cacti like full sun and dry soil.").unwrap();
    let second = rag.index_file("garden", &path).await.unwrap();

    assert_eq!(first.id, second.id);
    let documents = rag.list_documents(Some("garden")).await.unwrap();
    assert_eq!(documents.len(), 1);

    let hits = rag.search("cacti sun", Some("garden"), 3).await.unwrap();
    assert!(hits.iter().any(|h| h.content.contains("Cacti")));
}

#[tokio::test]
async fn test_rag_search_edge_cases_and_delete() {
    let pool = common::setup_test_db().await;
    let rag = common::rag_service(&pool, 200, 20);

    let doc = rag
        .index_document("default", "Empty", "   \n\n  ", None)
        .await
        .unwrap();
    assert_eq!(doc.chunk_count, 0);

    assert!(rag.search("   ", None, 5).await.unwrap().is_empty());
    assert!(rag.search("anything", None, 0).await.unwrap().is_empty());

    rag.delete_document(&doc.id).await.unwrap();
    let err = rag.delete_document(&doc.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(rag.get_document("missing").await, Err(DomainError::DocumentNotFound(_))));
}

#[tokio::test]
async fn test_hashing_embeddings_are_deterministic_and_normalised() {
    let provider = HashingEmbeddingProvider::new(64);
    let a = provider.embed("Water the tomatoes").await.unwrap();
    let b = provider.embed("water the TOMATOES").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);

    let batch = provider
        .embed_batch(&["one".to_string(), "two".to_string()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
}

#[tokio::test]
async fn test_todo_repository_filters_and_tags() {
    let pool = common::setup_test_db().await;
    let repo = SqliteTodoRepository::new(pool);

    let invoice = Todo::new("Send invoice")
        .with_priority(TodoPriority::High)
        .with_project("Acme");
    let mut report = Todo::new("Write report").with_status(TodoStatus::InProgress);
    report.tags = vec!["Work".to_string()];
    let plants = Todo::new("Water plants").with_status(TodoStatus::Completed);
    for todo in [&invoice, &report, &plants] {
        repo.create(todo).await.unwrap();
    }

    let high = repo
        .list(&TodoFilter {
            priority: Some(TodoPriority::High),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].id, invoice.id);

    let by_project = repo
        .list(&TodoFilter {
            project: Some("acme".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_project.len(), 1);

    let tagged = repo
        .list(&TodoFilter {
            tag: Some("#work".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].tags, vec!["work"]);

    let limited = repo
        .list(&TodoFilter {
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let all_tags = repo
        .apply_tags(invoice.id, &["Billing".to_string(), "work".to_string()])
        .await
        .unwrap();
    assert_eq!(all_tags, vec!["billing", "work"]);
    let names: Vec<String> = repo.list_tags().await.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["billing", "work"]);
}

#[tokio::test]
async fn test_missing_todo() {
    let pool = common::setup_test_db().await;
    let repo = SqliteTodoRepository::new(pool);
    let id = uuid::Uuid::new_v4();

    assert!(repo.get(id).await.unwrap().is_none());
    assert!(matches!(repo.get_todo(id).await, Err(DomainError::TodoNotFound(missing)) if missing == id));
    assert!(repo.apply_tags(id, &["x".to_string()]).await.is_err());
}

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("aide.db").display());

    let todo = Todo::new("Persist me");
    {
        let pool = initialize_database(&url, None).await.unwrap();
        SqliteTodoRepository::new(pool.clone()).create(&todo).await.unwrap();
        pool.close().await;
    }

    let pool = initialize_database(&url, None).await.unwrap();
    let loaded = SqliteTodoRepository::new(pool).get(todo.id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Persist me");
}

#[tokio::test]
async fn test_rag_service_shares_store_across_handles() {
    let pool = common::setup_test_db().await;
    let writer = common::rag_service(&pool, 200, 20);
    let reader = Arc::clone(&writer);
    writer
        .index_document("default", "Shared", "Shared content about sourdough starters.", None)
        .await
        .unwrap();
    assert_eq!(reader.list_documents(None).await.unwrap().len(), 1);
}
