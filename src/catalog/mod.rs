pub mod client;
pub mod parse;

pub use client::{Backoff, CatalogClient, CatalogSource};
pub use parse::{parse_known_colors, parse_search_results, KnownColor, SearchHit};
