pub mod event_search_use_case;
pub mod ports;
