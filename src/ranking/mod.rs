//! Ranking-resolution subsystem: finds where an item sits in the category
//! leaderboards discovered on its detail page.
//!
//! Leaderboard pages prepend browse history and sponsored carousels before
//! the real list, so every page is anchored at its first rank marker and
//! truncated there before any counting happens. Ranks come from embedded
//! unit-index markers when present, otherwise from anchor-based positional
//! counting.

pub(crate) mod aggregate;
pub(crate) mod anchor;
pub(crate) mod discover;
pub(crate) mod entries;
pub(crate) mod resolve;
pub(crate) mod scan;

pub use aggregate::{rank_in_categories, RankResult};
pub use discover::{discover_categories, CategoryCandidate};
pub use entries::ItemRef;
