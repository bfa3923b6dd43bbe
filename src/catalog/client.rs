use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::{PartMatchError, Result};

const PART_PAGE_PATH: &str = "/v2/catalog/catalogitem.page";
const SEARCH_PATH: &str = "/ajax/clone/search/searchproduct.ajax";

/// Read access to the remote catalog.
///
/// `Ok(None)` means the resource is not available right now: missing,
/// redirected elsewhere or refused. Transport failures are errors.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// HTML of the catalog item page for `item_no`
    async fn part_page(&self, item_no: &str) -> Result<Option<String>>;

    /// Raw JSON of a product search for `query`
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

/// Doubling delay applied after refused or redirected requests.
///
/// The delay is never reset during a run: once the catalog starts refusing,
/// every later failure waits longer.
#[derive(Debug)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { current: initial, max }
    }

    /// Double the delay and return the new value
    pub fn penalize(&mut self) -> Duration {
        self.current = (self.current * 2).min(self.max);
        self.current
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}

pub struct CatalogClient {
    client: Client,
    base_url: Url,
    results_per_page: u32,
    backoff: Mutex<Backoff>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| PartMatchError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            results_per_page: config.results_per_page,
            backoff: Mutex::new(Backoff::new(
                Duration::from_millis(config.initial_backoff_ms),
                Duration::from_millis(config.max_backoff_ms),
            )),
        })
    }

    pub fn part_url(&self, item_no: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(PART_PAGE_PATH);
        url.query_pairs_mut().clear().append_pair("P", item_no);
        url
    }

    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(SEARCH_PATH);
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("rpp", &self.results_per_page.to_string());
        url
    }

    pub fn current_backoff(&self) -> Duration {
        self.backoff.lock().current()
    }

    async fn back_off(&self) {
        let delay = self.backoff.lock().penalize();
        warn!("Backing off for {:?}", delay);
        tokio::time::sleep(delay).await;
    }

    /// GET `url`, returning the body only for a non-redirected 200
    async fn fetch(&self, url: Url) -> Result<Option<String>> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        info!("HTTP status {} for {}", status.as_u16(), url);

        if response.url() != &url {
            debug!("Was redirected to {}", response.url());
            if status.as_u16() >= 400 {
                self.back_off().await;
            }
            return Ok(None);
        }

        if status != StatusCode::OK {
            self.back_off().await;
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn part_page(&self, item_no: &str) -> Result<Option<String>> {
        self.fetch(self.part_url(item_no)).await
    }

    async fn search(&self, query: &str) -> Result<Option<String>> {
        self.fetch(self.search_url(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> CatalogConfig {
        CatalogConfig {
            base_url: base_url.to_string(),
            initial_backoff_ms: 1,
            max_backoff_ms: 8,
            request_delay_ms: 0,
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_millis(1500));
        assert_eq!(backoff.penalize(), Duration::from_millis(1000));
        assert_eq!(backoff.penalize(), Duration::from_millis(1500));
        assert_eq!(backoff.penalize(), Duration::from_millis(1500));
    }

    #[test]
    fn test_urls() {
        let client = CatalogClient::new(&test_config("https://catalog.example")).unwrap();
        assert_eq!(
            client.part_url("3626bpb0123").as_str(),
            "https://catalog.example/v2/catalog/catalogitem.page?P=3626bpb0123"
        );
        assert_eq!(
            client.search_url("Minifigure Head Dual Sided").as_str(),
            "https://catalog.example/ajax/clone/search/searchproduct.ajax?q=Minifigure+Head+Dual+Sided&rpp=500"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = CatalogClient::new(&test_config("not a url"));
        assert!(matches!(result, Err(PartMatchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_part_page_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PART_PAGE_PATH))
            .and(query_param("P", "3626bp01"))
            .and(header("user-agent", CatalogConfig::default().user_agent.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html>ok</html>"),
            )
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        let page = client.part_page("3626bp01").await.unwrap();
        assert_eq!(page.as_deref(), Some("<html>ok</html>"));
        assert_eq!(client.current_backoff(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_part_page_decodes_declared_charset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PART_PAGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                b"<a>Reddish Brown N\xE9e</a>".to_vec(),
                "text/html; charset=iso-8859-1",
            ))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        let page = client.part_page("3626bp01").await.unwrap();
        assert_eq!(page.as_deref(), Some("<a>Reddish Brown Née</a>"));
    }

    #[tokio::test]
    async fn test_non_ok_status_backs_off() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PART_PAGE_PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        assert_eq!(client.part_page("3626bp01").await.unwrap(), None);
        assert_eq!(client.current_backoff(), Duration::from_millis(2));
        assert_eq!(client.part_page("3626bp01").await.unwrap(), None);
        assert_eq!(client.current_backoff(), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_redirect_is_not_a_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PART_PAGE_PATH))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/v2/catalog/notfound.page"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/catalog/notfound.page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        assert_eq!(client.part_page("3626zz").await.unwrap(), None);
        // redirected to a 200 page: no penalty
        assert_eq!(client.current_backoff(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_redirect_to_error_backs_off() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/blocked"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        assert_eq!(client.search("Minifigure Head").await.unwrap(), None);
        assert_eq!(client.current_backoff(), Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_search_sends_query_and_page_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("q", "Minifigure Head Beard"))
            .and(query_param("rpp", "500"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json; charset=utf-8")
                    .set_body_string(r#"{"result":{"typeList":[]}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = CatalogClient::new(&test_config(&server.uri())).unwrap();
        let body = client.search("Minifigure Head Beard").await.unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"result":{"typeList":[]}}"#));
    }
}
