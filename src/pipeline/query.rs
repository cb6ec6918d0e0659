//! Canonical query keys and the request-side parsing the upstream filters
//! need (city/state split, local-day bounds, keyword string).

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Deterministic identity of a logical search. Two requests that differ only
/// in location casing, interest casing or interest order share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(location: &str, interests: &[String], date: Option<&str>) -> Self {
        let location = location.trim().to_lowercase();
        let mut interests: Vec<String> = interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        interests.sort();
        interests.dedup();
        let date = date.map(str::trim).unwrap_or_default();

        // JSON array encoding keeps the three parts unambiguous whatever
        // characters they contain.
        let key = serde_json::json!([location, interests, date]).to_string();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// City and state code pulled out of a free-form location string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub state_code: String,
}

/// Splits `"City, ST"`; falls back to `"City ST"` when there is no comma.
pub fn parse_location(location: &str) -> Location {
    let mut parts = location.splitn(2, ',').map(str::trim);
    let city = parts.next().unwrap_or_default().to_string();
    let state_code = parts
        .next()
        .and_then(|rest| rest.split(',').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    if state_code.is_empty() && city.contains(' ') {
        if let Some((head, tail)) = city.rsplit_once(' ') {
            return Location {
                city: head.trim().to_string(),
                state_code: tail.trim().to_string(),
            };
        }
    }

    Location { city, state_code }
}

/// Inclusive local-time window covering one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBounds {
    pub start: String,
    pub end: String,
}

pub fn day_bounds(date: &str) -> Option<DayBounds> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(day) => {
            let day = day.format("%Y-%m-%d");
            Some(DayBounds {
                start: format!("{day}T00:00:00"),
                end: format!("{day}T23:59:59"),
            })
        }
        Err(e) => {
            warn!("Ignoring unparseable date filter '{}': {}", date, e);
            None
        }
    }
}

/// Space-joined keyword query in request order, or `None` if nothing remains.
pub fn keyword_query(interests: &[String]) -> Option<String> {
    let q = interests
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!q.is_empty()).then_some(q)
}
