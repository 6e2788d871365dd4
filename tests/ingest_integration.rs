//! End-to-end test: ingest text files, then answer from them
//! 
//! Ollama is replaced by a mockito server; the store is a memory snapshot in
//! a temp directory, reopened between ingestion and asking.

use mockito::{Matcher, Server};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use docqa::{
    config::Config,
    embedding::OllamaEmbedder,
    ingest::{Chunker, Ingestor},
    rag::QaPipeline,
    store::{open_store, EmbeddingSpec},
};

fn config_for(server_url: &str, dir: &TempDir) -> Config {
    let (host, port) = server_url
        .trim_start_matches("http://")
        .split_once(':')
        .unwrap();

    let mut config = Config::default();
    config.ollama.host = host.to_string();
    config.ollama.port = port.parse().unwrap();
    config.ollama.request_timeout_secs = 5;
    config.store.path = dir.path().join("store.json").display().to_string();
    config.ingest.chunk_size = 200;
    config.ingest.chunk_overlap = 20;
    config.retry.max_retries = 1;
    config.retry.base_delay_ms = 1;
    config
}

#[tokio::test]
async fn test_ingest_then_ask() {
    let mut server = Server::new_async().await;
    let _invoice = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("(?i)invoice|total".to_string()))
        .with_status(200)
        .with_body(r#"{"embedding":[1.0,0.0,0.0]}"#)
        .create_async()
        .await;
    let _other = server
        .mock("POST", "/api/embeddings")
        .match_body(Matcher::Regex("lunch".to_string()))
        .with_status(200)
        .with_body(r#"{"embedding":[0.0,1.0,0.0]}"#)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::Regex("Invoice 2291".to_string()))
        .with_status(200)
        .with_body(r#"{"response":"The total is 40 EUR.","done":true}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(docs.join("invoice.txt"), "Invoice 2291\nTotal due: 40 EUR").unwrap();
    std::fs::write(docs.join("memo.txt"), "Team lunch on Friday").unwrap();

    let config = config_for(&server.url(), &dir);

    {
        let store = open_store(&config).await.unwrap();
        let embedder = OllamaEmbedder::new(
            &config.ollama_url(),
            &config.ollama.embedding_model,
            Duration::from_secs(5),
        )
        .unwrap();
        let ingestor = Ingestor::new(
            Arc::new(embedder),
            store.clone(),
            Chunker::from_config(&config.ingest).unwrap(),
            config.ingest.batch_size,
        );

        let ingested = ingestor.ingest_paths(&[docs.clone()]).await.unwrap();
        assert_eq!(ingested.len(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.embedding_spec().await.unwrap(),
            Some(EmbeddingSpec::new("nomic-embed-text", 3))
        );
    }

    let pipeline = QaPipeline::from_config(&config).await.unwrap();
    let answer = pipeline.ask("What is the invoice total?").await.unwrap();

    assert_eq!(answer.text, "The total is 40 EUR.");
    assert_eq!(answer.source_identifier.as_deref(), Some("invoice.txt"));
    assert!(answer
        .source_link
        .as_deref()
        .unwrap()
        .starts_with("http://localhost:9000/documents/invoice.txt?expires="));
    assert_eq!(answer.sources[0].score, 1.0);
    generate.assert_async().await;
}

#[tokio::test]
async fn test_embedding_outage_surfaces_as_unavailable() {
    let mut server = Server::new_async().await;
    let _down = server
        .mock("POST", "/api/embeddings")
        .with_status(503)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/api/generate")
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_for(&server.url(), &dir);

    let pipeline = QaPipeline::from_config(&config).await.unwrap();
    let err = pipeline.ask("What is the total?").await.unwrap_err();

    assert!(matches!(err, docqa::QaError::ServiceUnavailable { ref service, .. } if service == "embedding"));
    generate.assert_async().await;
}
