//! Bounded-concurrency snippet enrichment.
//!
//! A fixed number of worker tasks claim indices from a shared atomic cursor.
//! Claiming is a single `fetch_add`, so no index is processed twice, and each
//! result is written back at its original index, so output order never
//! depends on which worker finished first. Any summarizer failure (or a
//! worker that dies) degrades only the affected events to fallback text.

use crate::app::ports::SummarizerPort;
use crate::common::constants::SNIPPET_MAX_CHARS;
use crate::common::types::EventRecord;
use crate::observability::metrics;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Deterministic snippet used whenever the summarizer cannot provide one.
pub fn fallback_snippet(ev: &EventRecord) -> String {
    match ev.venue.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(venue) => format!("{} at {}.", ev.title, venue),
        None => format!("{}.", ev.title),
    }
}

/// Trims and caps summarizer output; `None` if nothing usable remains.
pub fn clean_snippet(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= SNIPPET_MAX_CHARS {
        return Some(text.to_string());
    }
    let cut: String = text.chars().take(SNIPPET_MAX_CHARS - 1).collect();
    Some(format!("{}…", cut.trim_end()))
}

pub struct EnrichmentPool {
    summarizer: Option<Arc<dyn SummarizerPort>>,
    concurrency: usize,
}

impl EnrichmentPool {
    pub fn new(summarizer: Option<Arc<dyn SummarizerPort>>, concurrency: usize) -> Self {
        Self {
            summarizer,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fills in every missing snippet. Events that already carry one are
    /// passed through untouched. Output has the same length and order as input.
    pub async fn enrich(&self, events: Vec<EventRecord>) -> Vec<EventRecord> {
        let pending = events.iter().filter(|ev| ev.snippet.is_none()).count();
        if pending == 0 {
            return events;
        }
        metrics::enrich::carried_over(events.len() - pending);

        let Some(summarizer) = self.summarizer.clone() else {
            debug!("No summarizer configured; using fallback text for {} events", pending);
            metrics::enrich::fallback(pending);
            return events
                .into_iter()
                .map(|mut ev| {
                    if ev.snippet.is_none() {
                        ev.snippet = Some(fallback_snippet(&ev));
                    }
                    ev
                })
                .collect();
        };

        let shared = Arc::new(events);
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(pending);

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let shared = shared.clone();
            let cursor = cursor.clone();
            let summarizer = summarizer.clone();
            set.spawn(async move {
                let mut produced: Vec<(usize, String)> = Vec::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(ev) = shared.get(index) else {
                        break;
                    };
                    if ev.snippet.is_some() {
                        continue;
                    }
                    match summarizer.summarize(ev).await {
                        Ok(text) => match clean_snippet(&text) {
                            Some(snippet) => produced.push((index, snippet)),
                            None => warn!("Worker {} got empty snippet for '{}'", worker, ev.title),
                        },
                        Err(e) => warn!("Worker {} failed to summarize '{}': {}", worker, ev.title, e),
                    }
                }
                produced
            });
        }

        let mut snippets: Vec<Option<String>> = vec![None; shared.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(produced) => {
                    for (index, snippet) in produced {
                        snippets[index] = Some(snippet);
                    }
                }
                Err(e) => warn!("Enrichment worker aborted: {}", e),
            }
        }

        let events = Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone());
        let mut summarized = 0;
        let mut fallbacks = 0;
        let enriched: Vec<EventRecord> = events
            .into_iter()
            .zip(snippets)
            .map(|(mut ev, snippet)| {
                if ev.snippet.is_none() {
                    ev.snippet = Some(match snippet {
                        Some(s) => {
                            summarized += 1;
                            s
                        }
                        None => {
                            fallbacks += 1;
                            fallback_snippet(&ev)
                        }
                    });
                }
                ev
            })
            .collect();

        metrics::enrich::summarized(summarized);
        metrics::enrich::fallback(fallbacks);
        enriched
    }
}
