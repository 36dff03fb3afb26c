//! Full migration runs against a mocked OpenSearch node.

mod common;

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use people_search::error::AppError;
use people_search::schema::Migrator;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INDEX: &str = "expertise";

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn scaffold() -> TempDir {
    let dir = TempDir::new().unwrap();
    let base = dir.path();
    write(
        base,
        "schema/expertise/settings.json",
        &json!({
            "index.number_of_shards": 1,
            "index.knn": true,
            "index.max_result_window": 20000,
            "analysis": {
                "analyzer": {
                    "phonetic_analyzer": { "tokenizer": "standard", "filter": ["metaphone_filter"] },
                    "text_analyzer": { "tokenizer": "standard", "filter": ["synonym_filter", "stop_filter"] }
                },
                "filter": {
                    "metaphone_filter": { "type": "phonetic", "encoder": "metaphone" },
                    "synonym_filter": { "type": "synonym_graph", "synonyms": [] },
                    "stop_filter": { "type": "stop", "stopwords": [] }
                }
            }
        })
        .to_string(),
    );
    write(
        base,
        "schema/expertise/mapping.json",
        &json!({
            "properties": {
                "name": {
                    "type": "text",
                    "fields": { "ph": { "type": "text", "analyzer": "phonetic_analyzer" } }
                }
            }
        })
        .to_string(),
    );
    write(base, "schema/expertise/synonyms.txt", "nyc, new york\n");
    write(base, "schema/expertise/stopwords.txt", "the, a\n");
    write(
        base,
        "scripts/expertise/normalize_score.json",
        r#"{"script": {"lang": "painless", "source": "_score / 10"}}"#,
    );
    write(
        base,
        "templates/keyword_search.json",
        r#"{"query": {"bool": {"must": "QUERY_MUSTS"}}}"#,
    );
    dir
}

fn acknowledged() -> serde_json::Value {
    json!({ "acknowledged": true })
}

#[tokio::test]
async fn migrates_absent_index_end_to_end() {
    let dir = scaffold();
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(HEAD).path(format!("/{INDEX}"));
            then.status(404);
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/{INDEX}")).json_body(json!({
                "settings": {
                    "index.number_of_shards": 1,
                    "index.knn": true,
                    "index.max_result_window": 20000,
                    "analysis": {
                        "analyzer": {
                            "text_analyzer": { "tokenizer": "standard", "filter": ["synonym_filter", "stop_filter"] }
                        },
                        "filter": {
                            "synonym_filter": { "type": "synonym_graph", "synonyms": [] },
                            "stop_filter": { "type": "stop", "stopwords": [] }
                        }
                    }
                }
            }));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let close = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_close"));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let settings = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/{INDEX}/_settings")).json_body(json!({
                "index.max_result_window": 20000,
                "analysis": {
                    "analyzer": {
                        "text_analyzer": { "tokenizer": "standard", "filter": ["synonym_filter", "stop_filter"] }
                    },
                    "filter": {
                        "synonym_filter": { "type": "synonym_graph", "synonyms": ["nyc, new york"] },
                        "stop_filter": { "type": "stop", "stopwords": ["the", "a"] }
                    }
                }
            }));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let open = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_open"));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let mapping = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("/{INDEX}/_mapping"))
                .json_body(json!({ "properties": { "name": { "type": "text" } } }));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let script = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/_scripts/normalize_score")
                .json_body(json!({ "script": { "lang": "painless", "source": "_score / 10" } }));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let template = server
        .mock_async(|when, then| {
            when.method(PUT).path("/_scripts/keyword_search").json_body(json!({
                "script": {
                    "lang": "mustache",
                    "index": INDEX,
                    "source": "{\"query\":{\"bool\":{\"must\":{{#toJson}}QUERY_MUSTS{{/toJson}}}}}"
                }
            }));
            then.status(200).json_body(acknowledged());
        })
        .await;

    let migrator = Migrator::new(common::client_for(&server), dir.path());
    migrator.migrate(INDEX).await.unwrap();

    create.assert_async().await;
    close.assert_async().await;
    settings.assert_async().await;
    mapping.assert_async().await;
    script.assert_async().await;
    template.assert_async().await;
    // once after the settings update, once at the end
    assert_eq!(open.hits_async().await, 2);
}

#[tokio::test]
async fn unacknowledged_settings_reopen_index_and_stop() {
    let dir = scaffold();
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(HEAD).path(format!("/{INDEX}"));
            then.status(200);
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/{INDEX}"));
            then.status(200).json_body(acknowledged());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_close"));
            then.status(200).json_body(acknowledged());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/{INDEX}/_settings"));
            then.status(400).json_body(json!({
                "error": { "type": "illegal_argument_exception", "reason": "unknown setting" },
                "status": 400
            }));
        })
        .await;
    let open = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_open"));
            then.status(200).json_body(acknowledged());
        })
        .await;
    let mapping = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/{INDEX}/_mapping"));
            then.status(200).json_body(acknowledged());
        })
        .await;

    let migrator = Migrator::new(common::client_for(&server), dir.path());
    let err = migrator.migrate(INDEX).await.unwrap_err();

    assert!(matches!(err, AppError::Unacknowledged { .. }), "{err}");
    assert_eq!(create.hits_async().await, 0);
    assert_eq!(open.hits_async().await, 1);
    assert_eq!(mapping.hits_async().await, 0);
}

#[tokio::test]
async fn missing_schema_fails_before_touching_the_cluster() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    let exists = server
        .mock_async(|when, then| {
            when.method(HEAD).path(format!("/{INDEX}"));
            then.status(404);
        })
        .await;

    let migrator = Migrator::new(common::client_for(&server), dir.path());
    let err = migrator.migrate(INDEX).await.unwrap_err();

    assert!(matches!(err, AppError::Io { .. }));
    assert_eq!(exists.hits_async().await, 0);
}
