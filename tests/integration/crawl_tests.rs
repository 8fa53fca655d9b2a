//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full indexing cycle end-to-end.

use lexicrawl::config::{
    Config, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig, UserAgentConfig,
};
use lexicrawl::crawler::{Coordinator, STOPPED_MESSAGE};
use lexicrawl::storage::{share, SharedStorage, SiteRecord, SqliteStorage, Storage};
use lexicrawl::{Lemmatizer, LexiError, SiteStatus};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration indexing the given site roots
fn create_test_config(sites: &[&str], max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_concurrent_tasks: 4,
            politeness_delay: 5, // Very short for testing
            request_timeout: 5000,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
            referrer: Some("https://www.google.com".to_string()),
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        search: SearchConfig::default(),
        sites: sites
            .iter()
            .enumerate()
            .map(|(i, url)| SiteEntry {
                url: url.to_string(),
                name: format!("Site {}", i + 1),
            })
            .collect(),
    }
}

fn create_coordinator(sites: &[&str], max_depth: u32) -> (Coordinator, SharedStorage) {
    let storage = share(SqliteStorage::open_in_memory().unwrap());
    let coordinator = Coordinator::new(
        create_test_config(sites, max_depth),
        storage.clone(),
        Lemmatizer::russian(),
    )
    .unwrap();
    (coordinator, storage)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!(
            "<html><head><title>Тест</title></head><body>{}</body></html>",
            body
        ), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

fn site(storage: &SharedStorage, url: &str) -> SiteRecord {
    storage
        .lock()
        .unwrap()
        .find_site_by_url(url)
        .unwrap()
        .expect("site should exist")
}

fn page_paths(storage: &SharedStorage, site_id: i64) -> Vec<String> {
    let storage = storage.lock().unwrap();
    let mut paths: Vec<String> = storage
        .page_ids_for_site(site_id)
        .unwrap()
        .into_iter()
        .map(|id| storage.get_page(id).unwrap().path)
        .collect();
    paths.sort();
    paths
}

async fn run_to_completion(coordinator: &Coordinator) {
    coordinator.start_indexing().unwrap();
    tokio::time::timeout(Duration::from_secs(30), coordinator.wait_until_idle())
        .await
        .expect("indexing should finish");
}

#[tokio::test]
async fn test_scope_filtering_scenario() {
    let server = MockServer::start().await;
    let root = server.uri();

    mount_page(
        &server,
        "/",
        html(
            r##"<p>Главная страница сайта</p>
            <a href="/a">Раздел</a>
            <a href="/a#frag">Якорь</a>
            <a href="/doc.pdf">Документ</a>
            <a href="https://other.test/x">Чужой сайт</a>"##,
        ),
    )
    .await;
    mount_page(&server, "/a", html("<p>Раздел без ссылок</p>")).await;

    let (coordinator, storage) = create_coordinator(&[&root], 2);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Indexed);
    assert_eq!(record.name, "Site 1");
    assert!(record.last_error.is_none());
    assert_eq!(page_paths(&storage, record.id), vec!["/", "/a"]);

    let lemmas = storage
        .lock()
        .unwrap()
        .count_lemmas_for_site(record.id)
        .unwrap();
    assert!(lemmas > 0);
}

#[tokio::test]
async fn test_cyclic_links_fetched_once() {
    let server = MockServer::start().await;
    let root = server.uri();

    for (at, body) in [
        ("/", r#"<a href="/a">а</a><a href="/b">б</a><a href="/a">а</a>"#),
        ("/a", r#"<a href="/">главная</a><a href="/b">б</a>"#),
        ("/b", r#"<a href="/a">а</a><a href="/">главная</a><a href="/b">сама</a>"#),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(html(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (coordinator, storage) = create_coordinator(&[&root], 10);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Indexed);
    assert_eq!(page_paths(&storage, record.id), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let root = server.uri();

    mount_page(&server, "/", html(r#"<a href="/level1">1</a>"#)).await;
    mount_page(&server, "/level1", html(r#"<a href="/level2">2</a>"#)).await;
    mount_page(&server, "/level2", html(r#"<a href="/level3">3</a>"#)).await;
    mount_page(&server, "/level3", html("<p>глубоко</p>")).await;

    let (coordinator, storage) = create_coordinator(&[&root], 2);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(
        page_paths(&storage, record.id),
        vec!["/", "/level1", "/level2"]
    );
}

#[tokio::test]
async fn test_content_type_handling() {
    let server = MockServer::start().await;
    let root = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/data">данные</a><a href="/page">страница</a>"#),
    )
    .await;
    mount_page(
        &server,
        "/data",
        ResponseTemplate::new(200)
            .set_body_raw(r#"{"key": "value"}"#, "application/json"),
    )
    .await;
    mount_page(&server, "/page", html("<p>Обычная страница</p>")).await;

    let (coordinator, storage) = create_coordinator(&[&root], 3);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Indexed);
    assert!(record.last_error.is_none());
    assert_eq!(page_paths(&storage, record.id), vec!["/", "/page"]);
}

#[tokio::test]
async fn test_failed_link_marks_site_failed() {
    let server = MockServer::start().await;
    let root = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/broken">сломано</a><a href="/ok">работает</a>"#),
    )
    .await;
    mount_page(&server, "/broken", ResponseTemplate::new(500)).await;
    mount_page(&server, "/ok", html("<p>Работает</p>")).await;

    let (coordinator, storage) = create_coordinator(&[&root], 3);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Failed);
    let error = record.last_error.expect("error should be recorded");
    assert!(error.contains("HTTP 500"), "unexpected error: {}", error);
    assert_eq!(page_paths(&storage, record.id), vec!["/", "/ok"]);
}

#[tokio::test]
async fn test_unreachable_root_marks_site_failed() {
    let server = MockServer::start().await;
    let root = server.uri();
    mount_page(&server, "/", ResponseTemplate::new(404)).await;

    let (coordinator, storage) = create_coordinator(&[&root], 2);
    run_to_completion(&coordinator).await;

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Failed);
    assert!(page_paths(&storage, record.id).is_empty());
}

#[tokio::test]
async fn test_reindexing_replaces_site_data() {
    let server = MockServer::start().await;
    let root = server.uri();
    mount_page(&server, "/", html(r#"<a href="/a">а</a>"#)).await;
    mount_page(&server, "/a", html("<p>Кот</p>")).await;

    let (coordinator, storage) = create_coordinator(&[&root], 2);
    run_to_completion(&coordinator).await;
    let first = site(&storage, &root);

    run_to_completion(&coordinator).await;
    let second = site(&storage, &root);

    assert_ne!(first.id, second.id);
    assert_eq!(page_paths(&storage, second.id), vec!["/", "/a"]);
    assert_eq!(storage.lock().unwrap().count_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_start_and_stop_control_errors() {
    let server = MockServer::start().await;
    let root = server.uri();
    mount_page(
        &server,
        "/",
        html("<p>Медленная страница</p>").set_delay(Duration::from_secs(2)),
    )
    .await;

    let (coordinator, storage) = create_coordinator(&[&root], 2);

    assert!(matches!(
        coordinator.stop_indexing(),
        Err(LexiError::NotRunning)
    ));

    coordinator.start_indexing().unwrap();
    assert!(coordinator.is_indexing());
    assert!(matches!(
        coordinator.start_indexing(),
        Err(LexiError::AlreadyRunning)
    ));

    // Give the run time to create its site record
    tokio::time::sleep(Duration::from_millis(200)).await;

    coordinator.stop_indexing().unwrap();
    assert!(!coordinator.is_indexing());

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Failed);
    assert_eq!(record.last_error.as_deref(), Some(STOPPED_MESSAGE));

    // A fresh campaign can start after a stop
    run_to_completion(&coordinator).await;
    assert_eq!(site(&storage, &root).status, SiteStatus::Indexed);
}

#[tokio::test]
async fn test_index_single_page() {
    let server = MockServer::start().await;
    let root = server.uri();
    mount_page(
        &server,
        "/news",
        html(r#"<p>Новости дня</p><a href="/other">другая</a>"#),
    )
    .await;

    let (coordinator, storage) = create_coordinator(&[&root], 3);

    coordinator
        .index_page(&format!("{}/news", root))
        .await
        .unwrap();
    coordinator
        .index_page(&format!("{}/news", root))
        .await
        .unwrap();

    let record = site(&storage, &root);
    assert_eq!(record.status, SiteStatus::Indexed);
    assert_eq!(page_paths(&storage, record.id), vec!["/news"]);
    assert!(!coordinator.is_indexing());

    let out_of_scope = coordinator.index_page("https://elsewhere.test/news").await;
    assert!(matches!(out_of_scope, Err(LexiError::OutOfScope { .. })));
}
