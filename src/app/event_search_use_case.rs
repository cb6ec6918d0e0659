use crate::apis::seatgeek::SeatGeekClient;
use crate::app::ports::{EventSearchPort, SummarizerPort};
use crate::common::error::Result;
use crate::common::types::{SearchRequest, SearchResponse};
use crate::config::Config;
use crate::infra::openai_summarizer::OpenAiSummarizer;
use crate::pipeline::cache::QueryCache;
use crate::pipeline::enrich::EnrichmentPool;
use crate::pipeline::fetch::{FetchOrchestrator, QueryFilters};
use crate::pipeline::query::QueryKey;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Serves one `/events` request: look up the query's cache entry, pull the
/// next upstream page unless the query is exhausted, merge it into the
/// cached items, then fill in missing snippets.
pub struct EventSearchUseCase {
    cache: Arc<QueryCache>,
    fetcher: FetchOrchestrator,
    pool: EnrichmentPool,
}

impl EventSearchUseCase {
    pub fn new(
        upstream: Arc<dyn EventSearchPort>,
        summarizer: Option<Arc<dyn SummarizerPort>>,
        cache: Arc<QueryCache>,
        concurrency: usize,
    ) -> Self {
        Self {
            cache,
            fetcher: FetchOrchestrator::new(upstream),
            pool: EnrichmentPool::new(summarizer, concurrency),
        }
    }

    /// Wires the SeatGeek client and, when an API key is configured, the
    /// OpenAI summarizer.
    pub fn from_config(config: &Config) -> Self {
        let upstream: Arc<dyn EventSearchPort> = Arc::new(SeatGeekClient::new(
            config.seatgeek.base_url.clone(),
            config.seatgeek.client_id.clone(),
        ));
        let summarizer = config.openai.api_key.as_ref().map(|key| {
            Arc::new(OpenAiSummarizer::new(
                config.openai.endpoint.clone(),
                key.clone(),
                config.openai.model.clone(),
            )) as Arc<dyn SummarizerPort>
        });
        if summarizer.is_none() {
            info!("OPENAI_API_KEY not set; snippets will use fallback text");
        }
        Self::new(
            upstream,
            summarizer,
            Arc::new(QueryCache::new(config.cache.policy())),
            config.enrich.concurrency,
        )
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[instrument(skip(self, request), fields(location = %request.location))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let key = QueryKey::new(&request.location, &request.interests, request.date.as_deref());
        let handle = self.cache.get_or_create(&key);
        let mut entry = handle.lock().await;

        let mut upstream_debug = None;
        if entry.done {
            debug!("Query {} exhausted; serving {} cached items", key, entry.items.len());
        } else {
            let filters = entry
                .filters
                .get_or_insert_with(|| QueryFilters::from_request(request))
                .clone();
            let fetched = self.fetcher.next_page(&filters, entry.mode, entry.page).await?;
            let next_page = if fetched.done { entry.page } else { entry.page + 1 };
            info!(
                "Fetched {} items for page {} (done: {})",
                fetched.items.len(),
                entry.page,
                fetched.done
            );
            upstream_debug = fetched.debug;
            entry.commit(fetched.items, next_page, fetched.mode, fetched.done);
        }

        // Enrich a copy so a dropped request never leaves the entry half-written.
        let enriched = self.pool.enrich(entry.items.clone()).await;
        entry.items = enriched;

        Ok(SearchResponse::new(entry.items.clone(), upstream_debug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{SearchParams, UpstreamOutcome, UpstreamResponse};
    use crate::common::error::SearchError;
    use crate::common::types::{EventRecord, RawEvent, RawVenue, UpstreamDebug};
    use crate::pipeline::cache::CachePolicy;
    use crate::pipeline::fetch::FetchMode;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves `pages[n-1]` for page n under every mode except keyword search.
    struct PagedSearch {
        pages: Vec<Vec<RawEvent>>,
        calls: Mutex<Vec<SearchParams>>,
    }

    #[async_trait]
    impl EventSearchPort for PagedSearch {
        async fn search(&self, params: &SearchParams) -> Result<UpstreamResponse> {
            self.calls.lock().unwrap().push(params.clone());
            let events = if params.keywords.is_some() {
                Vec::new()
            } else {
                self.pages.get(params.page as usize - 1).cloned().unwrap_or_default()
            };
            Ok(UpstreamResponse {
                outcome: UpstreamOutcome::Events(events),
                debug: UpstreamDebug {
                    url: format!("test://events?page={}", params.page),
                    status: Some(200),
                    mode: None,
                    body: None,
                },
            })
        }
    }

    /// Page 1 has events under every mode; every later call fails.
    struct FailsAfterFirstPage {
        calls: Mutex<Vec<SearchParams>>,
    }

    #[async_trait]
    impl EventSearchPort for FailsAfterFirstPage {
        async fn search(&self, params: &SearchParams) -> Result<UpstreamResponse> {
            self.calls.lock().unwrap().push(params.clone());
            if params.page == 1 {
                return Ok(UpstreamResponse {
                    outcome: UpstreamOutcome::Events(vec![showing("Show A", "2026-01-07T19:00:00")]),
                    debug: UpstreamDebug {
                        url: "test://events?page=1".to_string(),
                        status: Some(200),
                        mode: None,
                        body: None,
                    },
                });
            }
            Ok(UpstreamResponse {
                outcome: UpstreamOutcome::Failed { reason: "status 503".to_string() },
                debug: UpstreamDebug {
                    url: format!("test://events?page={}", params.page),
                    status: Some(503),
                    mode: None,
                    body: Some("service unavailable".to_string()),
                },
            })
        }
    }

    struct MissingCredential;

    #[async_trait]
    impl EventSearchPort for MissingCredential {
        async fn search(&self, _params: &SearchParams) -> Result<UpstreamResponse> {
            Err(SearchError::Config("Server missing SEATGEEK_CLIENT_ID".to_string()))
        }
    }

    struct CountingSummarizer(AtomicUsize);

    #[async_trait]
    impl SummarizerPort for CountingSummarizer {
        async fn summarize(&self, event: &EventRecord) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Blurb for {}", event.title))
        }
    }

    fn showing(title: &str, start: &str) -> RawEvent {
        RawEvent {
            title: Some(title.to_string()),
            venue: Some(RawVenue {
                name: Some("Main Hall".to_string()),
                ..Default::default()
            }),
            datetime_local: Some(start.to_string()),
            ..Default::default()
        }
    }

    fn request() -> SearchRequest {
        SearchRequest {
            location: "Dallas, TX".to_string(),
            interests: vec!["Theatre".to_string()],
            date: None,
        }
    }

    fn cache() -> Arc<QueryCache> {
        Arc::new(QueryCache::new(CachePolicy {
            capacity: 16,
            ttl: Duration::from_secs(600),
        }))
    }

    #[tokio::test]
    async fn test_paginates_merges_and_stops_when_exhausted() {
        let upstream = Arc::new(PagedSearch {
            pages: vec![
                vec![showing("Show A", "2026-01-07T19:00:00"), showing("Show B", "2026-01-07T20:00:00")],
                vec![showing("Show A", "2026-01-06T19:00:00")],
            ],
            calls: Mutex::new(Vec::new()),
        });
        let summarizer = Arc::new(CountingSummarizer(AtomicUsize::new(0)));
        let port: Arc<dyn SummarizerPort> = summarizer.clone();
        let use_case = EventSearchUseCase::new(upstream.clone(), Some(port), cache(), 2);

        let first = use_case.search(&request()).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.descriptions, vec!["Blurb for Show A", "Blurb for Show B"]);
        assert_eq!(first.debug.as_ref().unwrap().mode, Some(FetchMode::CityOnly.index()));

        // same logical query, different casing and order
        let again = SearchRequest {
            location: "dallas, tx".to_string(),
            interests: vec!["theatre".to_string()],
            date: None,
        };
        let second = use_case.search(&again).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.items[0].showings, 2);
        assert_eq!(second.items[0].start_time.as_deref(), Some("2026-01-06T19:00:00"));
        assert_eq!(second.items[0].other_start_times, vec!["2026-01-07T19:00:00".to_string()]);
        // snippets were not recomputed
        assert_eq!(summarizer.0.load(Ordering::SeqCst), 2);

        let third = use_case.search(&request()).await.unwrap();
        assert_eq!(third.items.len(), 2);
        assert!(third.debug.is_some());

        let calls_before = upstream.calls.lock().unwrap().len();
        let fourth = use_case.search(&request()).await.unwrap();
        assert!(fourth.debug.is_none());
        assert_eq!(fourth.items, third.items);
        assert_eq!(upstream.calls.lock().unwrap().len(), calls_before);

        // page 1 tried keywords then city-only; later pages reuse city-only
        let calls = upstream.calls.lock().unwrap();
        assert!(calls[0].keywords.is_some());
        assert!(calls[1..].iter().all(|c| c.keywords.is_none() && c.city.is_some()));
        assert_eq!(calls.iter().map(|c| c.page).collect::<Vec<_>>(), vec![1, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_page_under_settled_mode_exhausts_query() {
        let upstream = Arc::new(FailsAfterFirstPage {
            calls: Mutex::new(Vec::new()),
        });
        let use_case = EventSearchUseCase::new(upstream.clone(), None, cache(), 2);

        let first = use_case.search(&request()).await.unwrap();
        assert_eq!(first.items.len(), 1);

        let second = use_case.search(&request()).await.unwrap();
        assert_eq!(second.items, first.items);
        let debug = second.debug.unwrap();
        assert_eq!(debug.status, Some(503));
        assert_eq!(debug.body.as_deref(), Some("service unavailable"));
        assert_eq!(upstream.calls.lock().unwrap().len(), 2);

        let third = use_case.search(&request()).await.unwrap();
        assert!(third.debug.is_none());
        assert_eq!(third.items, first.items);
        assert_eq!(upstream.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_later_pages_reuse_first_request_filters() {
        let upstream = Arc::new(FailsAfterFirstPage {
            calls: Mutex::new(Vec::new()),
        });
        let use_case = EventSearchUseCase::new(upstream.clone(), None, cache(), 2);

        let first = SearchRequest {
            location: "Dallas, TX".to_string(),
            interests: vec!["Rock".to_string(), "rock".to_string()],
            date: None,
        };
        let second = SearchRequest {
            location: "dallas, tx".to_string(),
            interests: vec!["rock".to_string()],
            date: None,
        };
        use_case.search(&first).await.unwrap();
        use_case.search(&second).await.unwrap();

        let calls = upstream.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].keywords.as_deref(), Some("Rock rock"));
        assert_eq!(calls[1], SearchParams { page: 2, ..calls[0].clone() });
    }

    #[tokio::test]
    async fn test_configuration_error_is_fatal() {
        let use_case = EventSearchUseCase::new(Arc::new(MissingCredential), None, cache(), 2);
        let err = use_case.search(&request()).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_without_summarizer_descriptions_use_fallback() {
        let upstream = Arc::new(PagedSearch {
            pages: vec![vec![showing("Show A", "2026-01-07T19:00:00")]],
            calls: Mutex::new(Vec::new()),
        });
        let use_case = EventSearchUseCase::new(upstream, None, cache(), 2);
        let resp = use_case.search(&request()).await.unwrap();
        assert_eq!(resp.descriptions, vec!["Show A at Main Hall."]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_key_are_serialized() {
        let upstream = Arc::new(PagedSearch {
            pages: vec![
                vec![showing("Show A", "2026-01-07T19:00:00")],
                vec![showing("Show B", "2026-01-07T19:00:00")],
            ],
            calls: Mutex::new(Vec::new()),
        });
        let use_case = Arc::new(EventSearchUseCase::new(upstream.clone(), None, cache(), 2));

        let a = tokio::spawn({
            let uc = use_case.clone();
            async move { uc.search(&request()).await.unwrap() }
        });
        let b = tokio::spawn({
            let uc = use_case.clone();
            async move { uc.search(&request()).await.unwrap() }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let mut lens = vec![a.items.len(), b.items.len()];
        lens.sort();
        assert_eq!(lens, vec![1, 2]);

        let handle = use_case.cache().get_or_create(&QueryKey::new("Dallas, TX", &["Theatre".to_string()], None));
        assert_eq!(handle.lock().await.page, 3);
    }
}
