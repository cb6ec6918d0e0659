//! Collapses showings of the same event into one record.
//!
//! Records are grouped by lowercase-trimmed (title, venue). The representative
//! start time is always the earliest one seen; every other distinct time is
//! kept once in `other_start_times`, in order of first observation. A record
//! that re-enters the merge (cached output merged with a new page) brings its
//! own showings count and alternate times along, so merging cached output with
//! new items gives the same groups as merging all the raw showings at once.

use crate::common::constants::DEDUP_KEY_SEPARATOR;
use crate::common::types::EventRecord;
use std::collections::HashMap;

pub fn dedup_key(ev: &EventRecord) -> String {
    let title = ev.title.trim().to_lowercase();
    let venue = ev.venue.as_deref().unwrap_or_default().trim().to_lowercase();
    format!("{title}{DEDUP_KEY_SEPARATOR}{venue}")
}

/// Merges `events` in order, returning one record per dedup key in first-seen order.
pub fn merge_events<I>(events: I) -> Vec<EventRecord>
where
    I: IntoIterator<Item = EventRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<EventRecord> = Vec::new();

    for ev in events {
        let key = dedup_key(&ev);
        match index.get(&key) {
            Some(&pos) => absorb(&mut merged[pos], ev),
            None => {
                index.insert(key, merged.len());
                merged.push(seed(ev));
            }
        }
    }

    merged
}

fn seed(mut ev: EventRecord) -> EventRecord {
    ev.showings = ev.showings.max(1);
    let mut others = std::mem::take(&mut ev.other_start_times);
    if let Some(start) = ev.start_time.clone() {
        others.retain(|t| *t != start);
    }
    for time in others {
        merge_start_time(&mut ev, time);
    }
    ev
}

fn absorb(existing: &mut EventRecord, incoming: EventRecord) {
    existing.showings += incoming.showings.max(1);

    if let Some(start) = incoming.start_time {
        merge_start_time(existing, start);
    }
    for time in incoming.other_start_times {
        merge_start_time(existing, time);
    }

    if existing.snippet.is_none() {
        existing.snippet = incoming.snippet;
    }
}

fn merge_start_time(existing: &mut EventRecord, incoming: String) {
    let Some(current) = existing.start_time.as_ref() else {
        existing.other_start_times.retain(|t| *t != incoming);
        existing.start_time = Some(incoming);
        return;
    };

    if incoming == *current {
        return;
    }

    if incoming < *current {
        let previous = existing.start_time.replace(incoming.clone());
        existing.other_start_times.retain(|t| *t != incoming);
        if let Some(previous) = previous {
            push_unique(&mut existing.other_start_times, previous);
        }
    } else {
        push_unique(&mut existing.other_start_times, incoming);
    }
}

fn push_unique(times: &mut Vec<String>, time: String) {
    if !times.contains(&time) {
        times.push(time);
    }
}
