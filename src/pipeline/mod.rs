//! Pipeline entry points for harvester operations.
//!
//! - `run_crawler`: Walk forum lists pass after pass, storing ratings
//! - `run_recommend`: Answer a recommendation query, crawling the user first if needed

pub mod crawl;
pub mod recommend;
pub mod traversal;

pub use crawl::run_crawler;
pub use recommend::run_recommend;
pub use traversal::{TraversalEngine, UserOrigin, Visit};
