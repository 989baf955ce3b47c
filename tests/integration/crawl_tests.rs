//! Integration tests for the crawler
//!
//! These tests use wiremock to serve search result pages and run the full
//! fetch, extract, reconcile, filter and store cycle end-to-end.

use flatwatch::config::{load_config, resolve_sources, Config};
use flatwatch::crawler::{build_orchestrator, CrawlOrchestrator, SourceSpec};
use flatwatch::output::{build_notifier, dispatch, MessageRenderer};
use flatwatch::storage::{open_store, SeenStore};
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Renders one result card
fn card(id: u64, price: u32) -> String {
    format!(
        r#"<article class="flat" data-id="{id}">
             <h2><a href="/expose/{id}">Wohnung {id}</a></h2>
             <span class="price">{price} €</span>
             <span class="size">{size} m²</span>
             <span class="address">Berlin-Neukölln</span>
           </article>"#,
        id = id,
        price = price,
        size = 40 + id % 30
    )
}

/// Renders a result page with a result-count header
fn page(count: u32, cards: &[String]) -> String {
    format!(
        r#"<html><body><h1 class="count">{} Angebote</h1><main>{}</main></body></html>"#,
        count,
        cards.join("\n")
    )
}

/// Serves 20 distinct listings per page for any `page` query value
struct EndlessResults;

impl Respond for EndlessResults {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page_no: u64 = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(1);
        let cards: Vec<String> = (0..20).map(|i| card(page_no * 100 + i, 600)).collect();
        ResponseTemplate::new(200).set_body_string(page(200, &cards))
    }
}

/// Test fixture: a mock site, a scratch directory and a config pointing at both
struct Fixture {
    server: MockServer,
    dir: TempDir,
}

impl Fixture {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: TempDir::new().unwrap(),
        }
    }

    /// Writes and loads a config; `crawler` lines go into `[crawler]`, `sections` before the source
    fn config(&self, crawler: &str, sections: &str, backend: &str) -> Config {
        let uri = self.server.uri();
        let store_path = match backend {
            "json" => self.dir.path().join("seen"),
            _ => self.dir.path().join("seen.db"),
        };
        let content = format!(
            r#"
[crawler]
fetch-attempts = 2
retry-delay = 10
request-timeout = 5
{crawler}

[store]
backend = "{backend}"
path = "{store}"

{sections}

[[source]]
name = "mock"
urls = ["{uri}/search"]
pagination = {{ kind = "query", param = "page" }}

[source.html]
item = "article.flat"
base-url = "{uri}"
result-count = {{ selector = "h1.count" }}

[source.html.id]
attrs = ["data-id"]

[[source.html.fields]]
field = "title"
selector = "h2"
required = true

[[source.html.fields]]
field = "url"
selector = "h2 a"
attrs = ["href"]

[[source.html.fields]]
field = "price"
selector = ".price"

[[source.html.fields]]
field = "size"
selector = ".size"

[[source.html.fields]]
field = "address"
selector = ".address"
"#,
            crawler = crawler,
            backend = backend,
            store = store_path.display(),
            sections = sections,
            uri = uri,
        );

        let mut file = NamedTempFile::new_in(self.dir.path()).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        load_config(file.path()).unwrap()
    }

    async fn requests(&self) -> usize {
        self.server.received_requests().await.unwrap().len()
    }
}

fn wire(config: &Config) -> (CrawlOrchestrator, Arc<dyn SeenStore>, SourceSpec) {
    let store = open_store(&config.store).unwrap();
    let orchestrator = build_orchestrator(config, store.clone()).unwrap();
    let spec = resolve_sources(config).unwrap().remove(0);
    (orchestrator, store, spec)
}

/// Page 1 shows 101 and 102 with a count of 3, page 2 shows 103
async fn mount_three_listings(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(3, &[card(103, 750)])))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(3, &[card(101, 650), card(102, 900)])),
        )
        .mount(server)
        .await;
}

fn ids(listings: &[flatwatch::Listing]) -> Vec<u64> {
    listings.iter().map(|l| l.id).collect()
}

#[tokio::test]
async fn test_end_to_end_two_pages() {
    let fixture = Fixture::start().await;
    mount_three_listings(&fixture.server).await;

    let config = fixture.config("", "", "sqlite");
    let (orchestrator, store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    assert_eq!(fixture.requests().await, 2);
    assert_eq!(ids(&outcome.accepted), vec![101, 102, 103]);
    assert_eq!(outcome.stats.pages, 2);

    let first = &outcome.accepted[0];
    assert_eq!(first.title, "Wohnung 101");
    assert_eq!(first.url, format!("{}/expose/101", fixture.server.uri()));
    assert_eq!(first.price, "650 €");
    assert_eq!(first.address, "Berlin-Neukölln");
    assert!(!first.image.is_empty());
    assert!(first.available_from.is_some());

    let stored = store.load("mock").unwrap();
    assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![101, 102, 103]);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let fixture = Fixture::start().await;
    mount_three_listings(&fixture.server).await;

    let config = fixture.config("", "", "sqlite");
    let (orchestrator, _store, spec) = wire(&config);

    let first = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();
    let second = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    assert_eq!(first.accepted.len(), 3);
    assert!(second.accepted.is_empty());
    assert_eq!(second.stats.extracted, 3);
}

#[tokio::test]
async fn test_seen_state_survives_reopening_the_store() {
    let fixture = Fixture::start().await;
    mount_three_listings(&fixture.server).await;
    let config = fixture.config("", "", "json");

    {
        let (orchestrator, _store, spec) = wire(&config);
        let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();
        assert_eq!(outcome.accepted.len(), 3);
    }

    let (orchestrator, _store, spec) = wire(&config);
    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();
    assert!(outcome.accepted.is_empty());
}

#[tokio::test]
async fn test_result_limit_bounds_pagination() {
    let fixture = Fixture::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(EndlessResults)
        .mount(&fixture.server)
        .await;

    let config = fixture.config("result-limit = 50", "", "sqlite");
    let (orchestrator, _store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    // 20 per page: the third page crosses 50 and is kept whole
    assert_eq!(fixture.requests().await, 3);
    assert_eq!(outcome.stats.pages, 3);
    assert_eq!(outcome.accepted.len(), 60);
}

#[tokio::test]
async fn test_max_pages_bounds_pagination() {
    let fixture = Fixture::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(EndlessResults)
        .mount(&fixture.server)
        .await;

    let config = fixture.config("max-pages = 2", "", "sqlite");
    let (orchestrator, _store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    assert_eq!(fixture.requests().await, 2);
    assert_eq!(outcome.accepted.len(), 40);
}

#[tokio::test]
async fn test_fetch_failure_keeps_partial_results() {
    let fixture = Fixture::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(3, &[card(101, 650), card(102, 900)])),
        )
        .mount(&fixture.server)
        .await;

    let config = fixture.config("", "", "sqlite");
    let (orchestrator, store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    // page 1 plus two attempts at page 2
    assert_eq!(fixture.requests().await, 3);
    assert!(outcome.is_partial());
    assert_eq!(ids(&outcome.accepted), vec![101, 102]);
    assert_eq!(store.load("mock").unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_card_is_skipped() {
    let fixture = Fixture::start().await;
    let mut cards: Vec<String> = (1..=5).map(|id| card(id, 500)).collect();
    cards[2] = cards[2].replace(r#" data-id="3""#, "");
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(4, &cards)))
        .mount(&fixture.server)
        .await;

    let config = fixture.config("", "", "sqlite");
    let (orchestrator, _store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    assert_eq!(ids(&outcome.accepted), vec![1, 2, 4, 5]);
    assert_eq!(outcome.stats.skipped, 1);
}

#[tokio::test]
async fn test_filter_and_notification() {
    let fixture = Fixture::start().await;
    mount_three_listings(&fixture.server).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&fixture.server)
        .await;

    let sections = format!(
        "[filter]\nmax-price = 800.0\n\n[notify]\nwebhook-url = \"{}/hook\"\n",
        fixture.server.uri()
    );
    let config = fixture.config("", &sections, "sqlite");
    let (orchestrator, store, spec) = wire(&config);

    let outcome = orchestrator.crawl(&spec, &spec.urls[0]).await.unwrap();

    // 102 is listed at 900 €
    assert_eq!(ids(&outcome.accepted), vec![101, 103]);
    assert_eq!(store.load("mock").unwrap().len(), 3);

    let notifier = build_notifier(&config).unwrap();
    let renderer = MessageRenderer::new(config.message.template.clone());
    let delivered = dispatch(notifier.as_ref(), &renderer, &outcome.accepted).await;
    assert_eq!(delivered, 2);
}
