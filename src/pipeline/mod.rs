//! Feed pipeline stages.
//!
//! - `normalize`: raw scrape entries into chapter records
//! - `guard`: reject scrapes that are mostly malformed
//! - `merge`: fold a scrape into a novel's rolling history
//! - `assemble`: combine per-novel records into one feed ordering
//! - `run`: drive all of the above for one feed kind
//! - `comments`: build the comments feed from host comment feeds

pub mod assemble;
pub mod comments;
pub mod guard;
pub mod merge;
pub mod normalize;
pub mod run;

pub use assemble::assemble;
pub use comments::{CommentsRunner, CommentsSummary};
pub use guard::{GuardResult, ScrapeGuard};
pub use merge::{MergeOutcome, MergeReport, merge};
pub use run::{FeedRunner, RunSummary};
