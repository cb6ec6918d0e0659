use crate::app::ports::{EventSearchPort, SearchParams, UpstreamOutcome, UpstreamResponse};
use crate::common::constants::{SEATGEEK_API, SEATGEEK_PER_PAGE, SEATGEEK_SORT};
use crate::common::error::{Result, SearchError};
use crate::common::types::{RawEvent, RawSearchPayload, UpstreamDebug};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

pub struct SeatGeekClient {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

impl SeatGeekClient {
    pub fn new(base_url: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn api_name(&self) -> &'static str {
        SEATGEEK_API
    }

    /// Query parameters for one call, excluding the credential.
    pub fn query_pairs(params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("per_page", SEATGEEK_PER_PAGE.to_string()),
            ("sort", SEATGEEK_SORT.to_string()),
            ("page", params.page.max(1).to_string()),
        ];
        if let Some(city) = &params.city {
            pairs.push(("venue.city", city.clone()));
        }
        if let Some(state) = &params.state_code {
            pairs.push(("venue.state", state.clone()));
        }
        if let Some(bounds) = &params.bounds {
            pairs.push(("datetime_local.gte", bounds.start.clone()));
            pairs.push(("datetime_local.lte", bounds.end.clone()));
        }
        if let Some(q) = &params.keywords {
            pairs.push(("q", q.clone()));
        }
        pairs
    }

    fn build_url(&self, pairs: &[(&'static str, String)]) -> Result<Url> {
        Url::parse_with_params(&self.base_url, pairs)
            .map_err(|e| SearchError::Config(format!("Invalid SeatGeek base URL '{}': {}", self.base_url, e)))
    }

    pub fn parse_payload(text: &str) -> Result<Vec<RawEvent>> {
        let payload: RawSearchPayload = serde_json::from_str(text)?;
        Ok(payload.events)
    }
}

#[async_trait]
impl EventSearchPort for SeatGeekClient {
    #[instrument(skip(self), fields(api = SEATGEEK_API))]
    async fn search(&self, params: &SearchParams) -> Result<UpstreamResponse> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| SearchError::Config("Server missing SEATGEEK_CLIENT_ID".to_string()))?;

        let pairs = Self::query_pairs(params);
        let debug_url = self.build_url(&pairs)?;
        let mut request_url = debug_url.clone();
        request_url.query_pairs_mut().append_pair("client_id", client_id);

        let url = debug_url.to_string();
        let failed = |reason: String, status: Option<u16>, body: Option<String>| UpstreamResponse {
            outcome: UpstreamOutcome::Failed { reason },
            debug: UpstreamDebug {
                url: url.clone(),
                status,
                mode: None,
                body,
            },
        };

        debug!("Requesting {}", url);
        let resp = match self.client.get(request_url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("SeatGeek request failed: {}", e);
                return Ok(failed(e.to_string(), None, None));
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("SeatGeek body read failed: {}", e);
                return Ok(failed(e.to_string(), Some(status.as_u16()), None));
            }
        };

        if !status.is_success() {
            warn!("SeatGeek error {} {}", status.as_u16(), text);
            return Ok(failed(
                format!("status {}", status.as_u16()),
                Some(status.as_u16()),
                Some(text),
            ));
        }

        match Self::parse_payload(&text) {
            Ok(events) => {
                info!("[SeatGeek] {} results from: {}", events.len(), url);
                Ok(UpstreamResponse {
                    outcome: UpstreamOutcome::Events(events),
                    debug: UpstreamDebug {
                        url: url.clone(),
                        status: Some(status.as_u16()),
                        mode: None,
                        body: None,
                    },
                })
            }
            Err(e) => {
                warn!("SeatGeek returned malformed payload: {}", e);
                Ok(failed(
                    format!("malformed payload: {e}"),
                    Some(status.as_u16()),
                    None,
                ))
            }
        }
    }
}
