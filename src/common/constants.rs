/// Upstream search defaults. These mirror the query shape the search API
/// expects and are overridable through `Config` where it makes sense.
pub const SEATGEEK_API: &str = "seatgeek";
pub const SEATGEEK_BASE_URL: &str = "https://api.seatgeek.com/2/events";
pub const SEATGEEK_PER_PAGE: u32 = 25;
pub const SEATGEEK_SORT: &str = "datetime_local.asc";

// Summarizer defaults
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/responses";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const SNIPPET_MAX_CHARS: usize = 200;

// Normalization
pub const UNTITLED_EVENT: &str = "Untitled event";

/// Separator between the title and venue halves of a dedup key. Both halves
/// are trimmed, so a control character can never appear at the seam.
pub const DEDUP_KEY_SEPARATOR: char = '\u{1f}';

// Service defaults
pub const SERVICE_NAME: &str = "event-backend";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ENRICH_CONCURRENCY: usize = 4;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_ENVIRONMENT: &str = "development";
