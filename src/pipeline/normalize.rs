use crate::common::constants::UNTITLED_EVENT;
use crate::common::types::{NormalizedEvent, RawEvent};

type ImageStrategy = fn(&RawEvent) -> Option<String>;

/// Image extraction strategies, evaluated in order; the first hit wins.
const IMAGE_STRATEGIES: &[ImageStrategy] = &[
    first_performer_with_image,
    first_performer_image,
    event_image,
];

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

fn first_performer_with_image(ev: &RawEvent) -> Option<String> {
    ev.performers
        .as_ref()?
        .iter()
        .find_map(|p| non_empty(p.image.as_ref()))
}

fn first_performer_image(ev: &RawEvent) -> Option<String> {
    non_empty(ev.performers.as_ref()?.first()?.image.as_ref())
}

fn event_image(ev: &RawEvent) -> Option<String> {
    non_empty(ev.image.as_ref())
}

pub fn select_image(ev: &RawEvent) -> Option<String> {
    IMAGE_STRATEGIES.iter().find_map(|strategy| strategy(ev))
}

/// Joins the non-empty venue parts with ", ".
pub fn venue_label(ev: &RawEvent) -> Option<String> {
    let venue = ev.venue.as_ref()?;
    let label = [&venue.name, &venue.city, &venue.state]
        .into_iter()
        .filter_map(|part| non_empty(part.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    (!label.is_empty()).then_some(label)
}

pub fn normalize_event(ev: &RawEvent) -> NormalizedEvent {
    NormalizedEvent {
        title: non_empty(ev.title.as_ref()).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        start_time: non_empty(ev.datetime_local.as_ref()),
        venue: venue_label(ev),
        url: non_empty(ev.url.as_ref()),
        image: select_image(ev),
    }
}
