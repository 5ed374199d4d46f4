//! End-to-end pipeline tests against the in-memory store, plus one run
//! against a mocked Elasticsearch to check the request sequence.

use serde_json::{json, Value};
use spark_common::store::{DocumentStore, ElasticsearchStore, InMemoryStore, SearchQuery};
use spark_ingest::pipeline::{IngestPipeline, PipelineOptions, RowPolicy, BEFORE_RECREATE};
use spark_ingest::tabular::TabularRow;
use spark_ingest::IngestError;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, Request, ResponseTemplate,
};

fn header() -> Vec<String> {
    vec!["passengerid".into(), "name".into(), "age".into()]
}

fn row(line: u64, cells: &[&str]) -> TabularRow {
    TabularRow::new(line, cells.to_vec())
}

fn pipeline(store: &Arc<InMemoryStore>) -> IngestPipeline {
    IngestPipeline::new(store.clone(), PipelineOptions::default())
}

async fn all_documents(store: &InMemoryStore, index: &str) -> Vec<Value> {
    store
        .search(index, &SearchQuery::MatchAll, 100)
        .await
        .unwrap()
        .into_iter()
        .map(|hit| hit.source)
        .collect()
}

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_round_trip() {
    let store = Arc::new(InMemoryStore::new());

    let report = pipeline(&store)
        .ingest(
            &header(),
            vec![row(2, &["1", "Alice", "30"]), row(3, &["2", "Bob", "25"])],
        )
        .await
        .unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_failed, 0);
    assert_eq!(report.documents_written, 2);
    assert_eq!(report.sample.len(), 2);

    let docs = all_documents(&store, "titanic").await;
    assert_eq!(docs.len(), 2);
    assert!(docs.contains(&json!({"passengerid": "1", "name": "Alice", "age": "30"})));
}

#[tokio::test]
async fn test_reingest_replaces_contents() {
    let store = Arc::new(InMemoryStore::new());

    pipeline(&store)
        .ingest(&header(), vec![row(2, &["1", "Alice", "30"])])
        .await
        .unwrap();
    pipeline(&store)
        .ingest(&header(), vec![row(2, &["2", "Bob", "25"])])
        .await
        .unwrap();

    let docs = all_documents(&store, "titanic").await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["passengerid"], "2");
    assert!(store.get_document("titanic", "1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_id_row_is_skipped() {
    let store = Arc::new(InMemoryStore::new());

    let report = pipeline(&store)
        .ingest(
            &header(),
            vec![row(2, &["1", "Alice", "30"]), row(3, &["", "Ghost", "99"])],
        )
        .await
        .unwrap();

    assert!(report.rows_failed >= 1);
    assert_eq!(report.documents_written, 1);
    assert_eq!(store.document_count("titanic").await, 1);
    assert!(all_documents(&store, "titanic")
        .await
        .iter()
        .all(|doc| doc["name"] != "Ghost"));
}

#[tokio::test]
async fn test_short_row_is_skipped() {
    let store = Arc::new(InMemoryStore::new());

    let report = pipeline(&store)
        .ingest(
            &header(),
            vec![row(2, &["1", "Alice", "30"]), row(3, &["2", "Bob"])],
        )
        .await
        .unwrap();

    assert_eq!(report.rows_failed, 1);
    assert!(report.row_errors[0].contains("line 3"));
    assert!(store.get_document("titanic", "2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_strict_mode_leaves_index_untouched() {
    let store = Arc::new(InMemoryStore::new());
    pipeline(&store)
        .ingest(&header(), vec![row(2, &["1", "Alice", "30"])])
        .await
        .unwrap();

    let strict = IngestPipeline::new(
        store.clone(),
        PipelineOptions {
            policy: RowPolicy::Strict,
            ..PipelineOptions::default()
        },
    );
    let err = strict
        .ingest(
            &header(),
            vec![row(2, &["2", "Bob", "25"]), row(3, &["3", "Carol"])],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::InvalidRows { count: 1, .. }));
    // Previous load still intact
    assert!(store.get_document("titanic", "1").await.unwrap().is_some());
    assert!(store.get_document("titanic", "2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_before_recreate_keeps_index() {
    let store = Arc::new(InMemoryStore::new());
    pipeline(&store)
        .ingest(&header(), vec![row(2, &["1", "Alice", "30"])])
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline(&store)
        .with_cancellation(cancel)
        .ingest(&header(), vec![row(2, &["2", "Bob", "25"])])
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Cancelled { stage } if stage == BEFORE_RECREATE));
    assert_eq!(store.document_count("titanic").await, 1);
    assert!(store.get_document("titanic", "1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_chunked_writes_load_everything() {
    let store = Arc::new(InMemoryStore::new());
    let rows: Vec<TabularRow> = (1..=25)
        .map(|i| {
            let id = i.to_string();
            TabularRow::new(i + 1, vec![id.clone(), format!("Passenger {}", i), "40".to_string()])
        })
        .collect();

    let report = IngestPipeline::new(
        store.clone(),
        PipelineOptions {
            batch_size: 10,
            sample_size: 5,
            ..PipelineOptions::default()
        },
    )
    .ingest(&header(), rows)
    .await
    .unwrap();

    assert_eq!(report.documents_written, 25);
    assert_eq!(report.sample.len(), 5);
    assert_eq!(store.document_count("titanic").await, 25);
}

#[tokio::test]
async fn test_csv_file_with_mixed_case_header() {
    let store = Arc::new(InMemoryStore::new());
    let file = csv_file(
        "PassengerId,Survived,Name\n\
         1,0,\"Braund, Mr. Owen Harris\"\n\
         2,1,\"Cumings, Mrs. John Bradley\"\n\
         ,1,Nobody\n",
    );

    let report = pipeline(&store).ingest_path(file.path()).await.unwrap();

    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_failed, 1);
    assert_eq!(report.documents_written, 2);

    let doc = store.get_document("titanic", "1").await.unwrap().unwrap();
    assert_eq!(doc["name"], "Braund, Mr. Owen Harris");
    assert_eq!(doc["survived"], "0");
}

#[tokio::test]
async fn test_missing_id_column_fails_before_writing() {
    let store = Arc::new(InMemoryStore::new());

    let err = pipeline(&store)
        .ingest_reader("name,age\nAlice,30\n".as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::MissingIdColumn(_)));
    assert!(!store.index_exists("titanic").await.unwrap());
}

#[tokio::test]
async fn test_unreachable_store_is_typed_error() {
    let store = Arc::new(InMemoryStore::new());
    store.set_offline(true);

    let err = pipeline(&store)
        .ingest(&header(), vec![row(2, &["1", "Alice", "30"])])
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Store(e) if e.is_retryable()));
}

#[tokio::test]
async fn test_elasticsearch_request_sequence() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/titanic"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/titanic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/titanic"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"acknowledged": true, "index": "titanic"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(|req: &Request| {
            let body = String::from_utf8(req.body.clone()).unwrap_or_default();
            let items: Vec<Value> = body
                .lines()
                .step_by(2)
                .filter_map(|line| serde_json::from_str::<Value>(line).ok())
                .map(|d| json!({"index": {"_id": d["index"]["_id"], "status": 201}}))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({"errors": false, "items": items}))
        })
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/titanic/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [
                {"_id": "1", "_source": {"passengerid": "1", "name": "Alice", "age": "30"}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(ElasticsearchStore::new(&server.uri(), Duration::from_secs(5)).unwrap());
    let report = IngestPipeline::new(
        store,
        PipelineOptions {
            batch_size: 2,
            sample_size: 1,
            ..PipelineOptions::default()
        },
    )
    .ingest(
        &header(),
        vec![
            row(2, &["1", "Alice", "30"]),
            row(3, &["2", "Bob", "25"]),
            row(4, &["3", "Carol", "41"]),
        ],
    )
    .await
    .unwrap();

    assert_eq!(report.documents_written, 3);
    assert_eq!(report.sample.len(), 1);

    let requests = server.received_requests().await.unwrap();
    let sequence: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        sequence,
        vec![
            "HEAD /titanic",
            "DELETE /titanic",
            "PUT /titanic",
            "POST /_bulk",
            "POST /_bulk",
            "POST /titanic/_search",
        ]
    );

    // Only the final chunk asks for a refresh
    let refresh: Vec<Option<String>> = requests
        .iter()
        .filter(|r| r.url.path() == "/_bulk")
        .map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "refresh")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(refresh, vec![Some("false".to_string()), Some("true".to_string())]);
}

#[tokio::test]
async fn test_bulk_item_failures_are_counted() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/titanic"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/titanic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(query_param("refresh", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [age]"
                }}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/titanic/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})))
        .mount(&server)
        .await;

    let store = Arc::new(ElasticsearchStore::new(&server.uri(), Duration::from_secs(5)).unwrap());
    let report = IngestPipeline::new(store, PipelineOptions::default())
        .ingest(
            &header(),
            vec![row(2, &["1", "Alice", "30"]), row(3, &["2", "Bob", "old"])],
        )
        .await
        .unwrap();

    assert_eq!(report.documents_written, 1);
    assert_eq!(report.bulk_failures, 1);
    assert!(!report.is_clean());
}
