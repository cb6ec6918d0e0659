//! Upstream fetching with progressive filter relaxation.
//!
//! The first page of a query walks the modes in order until one returns
//! events; that mode then sticks for every later page of the same query. An
//! empty page under the chosen mode means the source is exhausted.

use crate::app::ports::{EventSearchPort, SearchParams, UpstreamOutcome};
use crate::common::error::Result;
use crate::common::types::{NormalizedEvent, SearchRequest, UpstreamDebug};
use crate::observability::metrics;
use crate::pipeline::normalize::normalize_event;
use crate::pipeline::query::{day_bounds, keyword_query, parse_location, DayBounds, Location};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchMode {
    /// City/state filter plus keyword query.
    CityAndKeywords,
    /// City/state filter only.
    CityOnly,
    /// Neither; only the date window (if any) applies.
    Unfiltered,
}

impl FetchMode {
    pub const ALL: [FetchMode; 3] = [
        FetchMode::CityAndKeywords,
        FetchMode::CityOnly,
        FetchMode::Unfiltered,
    ];

    pub fn index(self) -> usize {
        match self {
            FetchMode::CityAndKeywords => 0,
            FetchMode::CityOnly => 1,
            FetchMode::Unfiltered => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FetchMode::CityAndKeywords => "city_and_keywords",
            FetchMode::CityOnly => "city_only",
            FetchMode::Unfiltered => "unfiltered",
        }
    }

    fn uses_city(self) -> bool {
        !matches!(self, FetchMode::Unfiltered)
    }

    fn uses_keywords(self) -> bool {
        matches!(self, FetchMode::CityAndKeywords)
    }
}

/// Request-derived filters shared by every page of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilters {
    pub location: Location,
    pub keywords: Option<String>,
    pub bounds: Option<DayBounds>,
}

impl QueryFilters {
    pub fn from_request(request: &SearchRequest) -> Self {
        Self {
            location: parse_location(&request.location),
            keywords: keyword_query(&request.interests),
            bounds: request.date.as_deref().and_then(day_bounds),
        }
    }

    pub fn params(&self, mode: FetchMode, page: u32) -> SearchParams {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let (city, state_code) = if mode.uses_city() {
            (
                non_empty(&self.location.city),
                non_empty(&self.location.state_code),
            )
        } else {
            (None, None)
        };
        SearchParams {
            city,
            state_code,
            bounds: self.bounds.clone(),
            keywords: if mode.uses_keywords() { self.keywords.clone() } else { None },
            page,
        }
    }
}

/// Result of a single upstream call, already normalized.
#[derive(Debug, Clone)]
pub struct ModeFetch {
    pub items: Vec<NormalizedEvent>,
    pub failed: bool,
    pub debug: UpstreamDebug,
}

/// Result of advancing a query by one page.
#[derive(Debug, Clone)]
pub struct PageFetch {
    pub items: Vec<NormalizedEvent>,
    pub mode: Option<FetchMode>,
    pub done: bool,
    pub debug: Option<UpstreamDebug>,
}

pub struct FetchOrchestrator {
    upstream: Arc<dyn EventSearchPort>,
}

impl FetchOrchestrator {
    pub fn new(upstream: Arc<dyn EventSearchPort>) -> Self {
        Self { upstream }
    }

    /// Issues exactly one upstream call for `mode` and `page`.
    #[instrument(skip(self, filters, mode), fields(mode = mode.as_str()))]
    pub async fn fetch_page(
        &self,
        filters: &QueryFilters,
        mode: FetchMode,
        page: u32,
    ) -> Result<ModeFetch> {
        let params = filters.params(mode, page);
        let response = self.upstream.search(&params).await?;
        let mut debug = response.debug;
        debug.mode = Some(mode.index());

        match response.outcome {
            UpstreamOutcome::Events(raw) => {
                metrics::upstream::request(mode.as_str(), if raw.is_empty() { "empty" } else { "events" });
                let items: Vec<NormalizedEvent> = raw.iter().map(normalize_event).collect();
                debug!("Mode {} page {} returned {} events", mode.as_str(), page, items.len());
                Ok(ModeFetch { items, failed: false, debug })
            }
            UpstreamOutcome::Failed { reason } => {
                metrics::upstream::request(mode.as_str(), "failed");
                warn!("Upstream call failed under mode {}: {}", mode.as_str(), reason);
                Ok(ModeFetch { items: Vec::new(), failed: true, debug })
            }
        }
    }

    /// Fetches `page` under the remembered mode, or discovers the mode when
    /// none has produced results yet.
    pub async fn next_page(
        &self,
        filters: &QueryFilters,
        mode: Option<FetchMode>,
        page: u32,
    ) -> Result<PageFetch> {
        if let Some(mode) = mode {
            let fetched = self.fetch_page(filters, mode, page).await?;
            let done = fetched.items.is_empty();
            if done {
                info!("Query exhausted at page {} under mode {}", page, mode.as_str());
            }
            return Ok(PageFetch {
                items: fetched.items,
                mode: Some(mode),
                done,
                debug: Some(fetched.debug),
            });
        }

        let mut last_debug = None;
        for candidate in FetchMode::ALL {
            let fetched = self.fetch_page(filters, candidate, page).await?;
            last_debug = Some(fetched.debug);
            if !fetched.items.is_empty() {
                if candidate != FetchMode::CityAndKeywords {
                    metrics::upstream::fallback(candidate.as_str());
                    info!("Relaxed filters to mode {}", candidate.as_str());
                }
                return Ok(PageFetch {
                    items: fetched.items,
                    mode: Some(candidate),
                    done: false,
                    debug: last_debug,
                });
            }
        }

        info!("No mode produced results; query exhausted");
        Ok(PageFetch {
            items: Vec::new(),
            mode: None,
            done: true,
            debug: last_debug,
        })
    }
}
