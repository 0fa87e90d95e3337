//! Crawl state for a single site run
//!
//! # Components
//!
//! - `CrawlMode`: first run vs incremental, decided once per site
//! - `PageOutcome`: the incremental loop's continue/halt decision per page
//! - `StopReason`: why pagination of a site ended
//! - `SiteStage`: the pipeline step a site failure is attributed to

mod crawl_mode;
mod page_outcome;
mod site_stage;

// Re-export main types
pub use crawl_mode::CrawlMode;
pub use page_outcome::{PageOutcome, StopReason};
pub use site_stage::SiteStage;
