//! Integration tests for document ingestion
//!
//! Exercises the incremental, hash-keyed ingestion path against a real
//! temporary directory and an in-memory index.

use async_trait::async_trait;
use std::fs;
use tempfile::TempDir;
use vetdx_core::error::Result;
use vetdx_core::{Database, Embedder, Ingestor, VetDxError};

/// Deterministic embedder: projects text onto a small clinical vocabulary
struct VocabEmbedder;

const VOCAB: &[&str] = &[
    "vomiting", "diarrhea", "cough", "skin", "ear", "eye", "bone", "urine",
];

fn vectorize(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCAB
        .iter()
        .map(|term| lower.matches(term).count() as f32)
        .collect()
}

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }

    fn model_name(&self) -> &str {
        "vocab-test-embedder"
    }
}

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    db
}

#[tokio::test]
async fn test_ingest_file_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir(&docs).unwrap();
    let file = docs.join("parvo.txt");
    fs::write(&file, "Parvovirus causes vomiting and diarrhea in puppies.").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    let first = ingestor.ingest_file(&file, false).await.unwrap();
    assert!(first > 0);
    assert_eq!(db.count_chunks().unwrap(), first);

    // Unmodified file adds nothing the second time
    let second = ingestor.ingest_file(&file, false).await.unwrap();
    assert_eq!(second, 0);
    assert_eq!(db.count_chunks().unwrap(), first);
}

#[tokio::test]
async fn test_modified_file_is_reingested() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, "Initial observations about cough.").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    let first = ingestor.ingest_file(&file, false).await.unwrap();
    assert!(first > 0);

    fs::write(&file, "Revised observations: cough plus skin lesions around the ear.").unwrap();
    let second = ingestor.ingest_file(&file, false).await.unwrap();
    assert!(second > 0);
}

#[tokio::test]
async fn test_force_reingests_unchanged_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, "Stable content.").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    ingestor.ingest_file(&file, false).await.unwrap();
    let forced = ingestor.ingest_file(&file, true).await.unwrap();
    assert!(forced > 0);
}

#[tokio::test]
async fn test_unsupported_extension_is_typed_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("slides.pptx");
    fs::write(&file, "not text").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    let err = ingestor.ingest_file(&file, false).await.unwrap_err();
    match err {
        VetDxError::UnsupportedExtension(ext) => assert_eq!(ext, ".pptx"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_directory_batch_continues_past_bad_files() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("good.txt"), "Feline urinary obstruction overview.").unwrap();
    fs::write(docs.join("also_good.md"), "# Otitis\n\nExternal ear canal disease.").unwrap();
    // A corrupt PDF fails extraction but must not abort the batch
    fs::write(docs.join("broken.pdf"), "this is not a pdf").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    let stats = ingestor
        .ingest_directory(&docs, None, false)
        .await
        .unwrap();

    assert_eq!(stats.files_processed, 2);
    assert!(stats.chunks_added >= 2);
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].file.contains("broken.pdf"));
}

#[tokio::test]
async fn test_ingestion_cache_side_file_persists() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("doc.txt");
    fs::write(&file, "Ophthalmology: eye discharge grading.").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;

    {
        let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();
        ingestor.ingest_file(&file, false).await.unwrap();
        assert_eq!(ingestor.ingested_files(), 1);
    }

    let cache = temp.path().join("ingested_files.json");
    assert!(cache.exists());

    // A fresh ingestor picks up the records and still skips the file
    let mut reopened = Ingestor::new(&db, &embedder, temp.path()).unwrap();
    assert_eq!(reopened.ingested_files(), 1);
    assert_eq!(reopened.ingest_file(&file, false).await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_document_indexes_adhoc_text() {
    let temp = TempDir::new().unwrap();
    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    let mut metadata = std::collections::HashMap::new();
    metadata.insert("type".to_string(), "case_study".to_string());

    let added = ingestor
        .add_document("Resolved case: chronic diarrhea responding to diet.", metadata, "casos_clinicos")
        .await
        .unwrap();
    assert!(added > 0);
    assert_eq!(db.count_chunks().unwrap(), added);
}

#[tokio::test]
async fn test_clear_wipes_store_and_records() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("doc.txt");
    fs::write(&file, "Something about bone fractures.").unwrap();

    let db = test_db();
    let embedder = VocabEmbedder;
    let mut ingestor = Ingestor::new(&db, &embedder, temp.path()).unwrap();

    ingestor.ingest_file(&file, false).await.unwrap();
    ingestor.clear().unwrap();

    assert_eq!(db.count_chunks().unwrap(), 0);
    assert_eq!(ingestor.ingested_files(), 0);

    // After a clear the same file ingests again
    assert!(ingestor.ingest_file(&file, false).await.unwrap() > 0);
}
