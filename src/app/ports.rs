use crate::common::error::Result;
use crate::common::types::{EventRecord, RawEvent, UpstreamDebug};
use crate::pipeline::query::DayBounds;
use async_trait::async_trait;

/// Filters for one upstream search call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub bounds: Option<DayBounds>,
    pub keywords: Option<String>,
    pub page: u32,
}

/// What an upstream call produced. An empty `Events` is a legitimate
/// "no results"; `Failed` means the call itself did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Events(Vec<RawEvent>),
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub outcome: UpstreamOutcome,
    pub debug: UpstreamDebug,
}

/// Upstream event search. Transport and status failures come back as
/// `UpstreamOutcome::Failed`; `Err` is reserved for configuration problems.
#[async_trait]
pub trait EventSearchPort: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<UpstreamResponse>;
}

/// Produces a short descriptive snippet for an event.
#[async_trait]
pub trait SummarizerPort: Send + Sync {
    async fn summarize(&self, event: &EventRecord) -> Result<String>;
}
