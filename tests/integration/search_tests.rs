//! Integration tests for the query engine
//!
//! A small site is served by wiremock, indexed through the coordinator,
//! and then queried. A table-free morphology keeps lemmas equal to the
//! lowercase words so expectations stay exact.

use lexicrawl::config::{
    Config, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig, UserAgentConfig,
};
use lexicrawl::lemma::{MorphologyError, WordClass};
use lexicrawl::storage::{share, SharedStorage, SqliteStorage};
use lexicrawl::{Coordinator, Lemmatizer, LexiError, Morphology, SearchEngine, SearchResponse};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Every word is its own lemma; "и" and "в" are function words
struct IdentityMorphology;

impl Morphology for IdentityMorphology {
    fn normalize(&self, word: &str) -> Result<String, MorphologyError> {
        Ok(word.to_string())
    }

    fn classify(&self, word: &str) -> Vec<WordClass> {
        match word {
            "и" => vec![WordClass::Conjunction],
            "в" => vec![WordClass::Preposition],
            _ => vec![WordClass::Content],
        }
    }
}

const PAGES: &[(&str, &str)] = &[
    ("/1", "кот и собака гуляют"),
    ("/2", "кот спит дома"),
    ("/3", "собака лает громко"),
    ("/4", "кот собака кот кот"),
    ("/5", "лес поле река"),
];

fn config(root: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 2,
            max_concurrent_tasks: 4,
            politeness_delay: 0,
            request_timeout: 5000,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
            referrer: None,
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        search: SearchConfig::default(),
        sites: vec![SiteEntry {
            url: root.to_string(),
            name: "Тестовый сайт".to_string(),
        }],
    }
}

fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ), "text/html; charset=utf-8")
}

async fn mount_site(server: &MockServer) {
    let links: String = PAGES
        .iter()
        .map(|(at, _)| format!(r#"<a href="{}">{}</a>"#, at, at))
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Главная", &links))
        .mount(server)
        .await;

    for (at, text) in PAGES {
        Mock::given(method("GET"))
            .and(path(*at))
            .respond_with(page(&format!("Страница {}", at), &format!("<p>{}</p>", text)))
            .mount(server)
            .await;
    }
}

/// Indexes the mock site and returns the coordinator and a search engine
async fn indexed_site(server: &MockServer) -> (Coordinator, SearchEngine) {
    mount_site(server).await;

    let lemmatizer = Lemmatizer::new(Arc::new(IdentityMorphology));
    let storage: SharedStorage = share(SqliteStorage::open_in_memory().unwrap());
    let coordinator =
        Coordinator::new(config(&server.uri()), storage.clone(), lemmatizer.clone()).unwrap();

    coordinator.start_indexing().unwrap();
    tokio::time::timeout(Duration::from_secs(30), coordinator.wait_until_idle())
        .await
        .expect("indexing should finish");

    let engine = SearchEngine::new(storage, lemmatizer, SearchConfig::default());
    (coordinator, engine)
}

fn uris(response: &SearchResponse) -> Vec<&str> {
    response.results.iter().map(|r| r.uri.as_str()).collect()
}

#[tokio::test]
async fn test_query_intersects_lemmas() {
    let server = MockServer::start().await;
    let (_coordinator, engine) = indexed_site(&server).await;

    let response = engine.search("кот собака", None, 0, 20).unwrap();

    assert_eq!(response.count, 2);
    assert_eq!(uris(&response), vec!["/4", "/1"]);
    assert_eq!(response.results[0].relevance, 1.0);
    assert!(response.results[1].relevance < 1.0);

    let top = &response.results[0];
    assert_eq!(top.title, "Страница /4");
    assert_eq!(top.site, server.uri());
    assert_eq!(top.site_name, "Тестовый сайт");
}

#[tokio::test]
async fn test_empty_and_missing_queries() {
    let server = MockServer::start().await;
    let (_coordinator, engine) = indexed_site(&server).await;

    assert!(matches!(
        engine.search("", None, 0, 20),
        Err(LexiError::EmptyQuery)
    ));

    let missing = engine.search("жираф", None, 0, 20).unwrap();
    assert_eq!(missing.count, 0);
    assert!(missing.results.is_empty());
}

#[tokio::test]
async fn test_lemma_on_most_pages_is_ignored() {
    let server = MockServer::start().await;
    let (_coordinator, engine) = indexed_site(&server).await;

    // "страница" is in the title of 5 of 6 pages
    let response = engine.search("страница", None, 0, 20).unwrap();
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn test_out_of_range_offset_keeps_count() {
    let server = MockServer::start().await;
    let (_coordinator, engine) = indexed_site(&server).await;

    let beyond = engine.search("кот", None, 40, 20).unwrap();
    assert_eq!(beyond.count, 3);
    assert!(beyond.results.is_empty());

    let second_page = engine.search("кот", None, 2, 2).unwrap();
    assert_eq!(second_page.count, 3);
    assert_eq!(second_page.results.len(), 1);
}

#[tokio::test]
async fn test_snippet_highlights_query_words() {
    let server = MockServer::start().await;
    let (_coordinator, engine) = indexed_site(&server).await;

    let response = engine.search("спит", None, 0, 20).unwrap();

    assert_eq!(uris(&response), vec!["/2"]);
    assert_eq!(response.results[0].snippet, "кот <b>спит</b> дома");
}

#[tokio::test]
async fn test_reindexed_page_leaves_results() {
    let server = MockServer::start().await;
    let (coordinator, engine) = indexed_site(&server).await;

    let before = engine.search("кот", None, 0, 20).unwrap();
    assert!(uris(&before).contains(&"/2"));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/2"))
        .respond_with(page("Страница /2", "<p>река течёт</p>"))
        .mount(&server)
        .await;

    coordinator
        .index_page(&format!("{}/2", server.uri()))
        .await
        .unwrap();

    let after = engine.search("кот", None, 0, 20).unwrap();
    assert_eq!(after.count, 2);
    assert!(!uris(&after).contains(&"/2"));
}
