// Event pipeline: query keys, upstream fetching, dedup, caching and enrichment

pub mod cache;
pub mod dedup;
pub mod enrich;
pub mod fetch;
pub mod normalize;
pub mod query;
