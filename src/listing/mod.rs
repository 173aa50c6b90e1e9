mod aggregator;
mod parser;
pub mod xml;

pub use aggregator::{Aggregator, DEFAULT_SCAN_CONCURRENCY};
pub use parser::{SEARCH_ORDER, SearchStrategy, find_all, parse_bucket_names, parse_listing};
