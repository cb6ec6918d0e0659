use serde::{Deserialize, Serialize};

/// One raw showing as returned by the upstream search API. Only the fields
/// the pipeline consumes are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawEvent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub venue: Option<RawVenue>,
    #[serde(default)]
    pub datetime_local: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub performers: Option<Vec<RawPerformer>>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawVenue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawPerformer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Upstream search response body.
#[derive(Debug, Default, Deserialize)]
pub struct RawSearchPayload {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// A single showing flattened into display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub title: String,
    pub start_time: Option<String>,
    pub venue: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
}

/// A deduplicated event: one record per distinct (title, venue) pair, with
/// the number of showings merged into it and the alternate start times.
/// Once `snippet` is set it travels with the record through later merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    pub start_time: Option<String>,
    pub venue: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub showings: u32,
    pub other_start_times: Vec<String>,
    pub snippet: Option<String>,
}

impl From<NormalizedEvent> for EventRecord {
    fn from(ev: NormalizedEvent) -> Self {
        Self {
            title: ev.title,
            start_time: ev.start_time,
            venue: ev.venue,
            url: ev.url,
            image: ev.image,
            showings: 1,
            other_start_times: Vec::new(),
            snippet: None,
        }
    }
}

/// Incoming `/events` request body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Diagnostics for the last upstream call made while serving a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamDebug {
    pub url: String,
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// `/events` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<EventRecord>,
    pub descriptions: Vec<String>,
    pub debug: Option<UpstreamDebug>,
}

impl SearchResponse {
    pub fn new(items: Vec<EventRecord>, debug: Option<UpstreamDebug>) -> Self {
        let descriptions = items
            .iter()
            .filter_map(|ev| ev.snippet.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { items, descriptions, debug }
    }
}
