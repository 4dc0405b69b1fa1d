//! Domain models for ITROPA.
//!
//! # Core Concepts
//!
//! - [`Need`]: A research topic traced through a fixed sequence of [`Era`]s.
//!   Exactly one era is the mutable future stage holding a forest of
//!   [`IndustryExpression`]s; the others are display-only text.
//! - [`IndustryExpression`]: One speculative industry. Expressions nest
//!   through `children` and are addressed by ids unique within their need.
//! - [`HistoryAction`]: A journal entry with before/after snapshots that the
//!   undo/redo history moves between its stacks.
//! - [`CachedAnalysis`]: Generated analysis keyed by expression id (or by an
//!   unordered expression pair), garbage-collected when its expressions go away.

mod analysis;
mod expression;
mod history;
mod need;

pub use analysis::*;
pub use expression::*;
pub use history::*;
pub use need::*;
