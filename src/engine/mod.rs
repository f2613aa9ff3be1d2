//! Pure match-processing stages: classification, ranking and bucketing.
//!
//! Nothing in here does I/O; `now` is always passed in.

pub mod classifier;
pub mod keywords;
pub mod organizer;
pub mod ranking;

pub use classifier::classify;
pub use keywords::KeywordTables;
pub use organizer::{organize, search, LeagueCatalog};
pub use ranking::{dedupe, rank};
