//! Published Cascade
//!
//! A [`Cascade`](crate::Cascade) is immutable, so an application keeps "the
//! current cascade" in one [`CascadeCell`] and replaces it as state changes.
//!
//! # Optimistic Updates
//!
//! Every update follows the same cycle:
//!
//! 1. Load the published [`Snapshot`] (a generation number plus a shared
//!    cascade).
//! 2. Compute the next cascade from it with `add`, `dirty`, `clean` or
//!    `set_all`. No lock is held; cleaners run here.
//! 3. Publish with a compare-and-swap on the generation. If another writer
//!    published first, start over from their snapshot.
//!
//! A clean that loses the race has already run its cleaners and will run them
//! again on the retry, which is why cleaners must be idempotent. A clean whose
//! cleaner fails publishes nothing.

mod config;
mod store;

pub use config::{CellConfig, DEFAULT_MAX_ATTEMPTS};
pub use store::{CascadeCell, Snapshot};
