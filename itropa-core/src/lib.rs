//! Core of ITROPA: the industry expression tree, the pure operations that
//! rebuild it, and the undo/redo history that journals every change.
//!
//! Nothing here performs I/O. The `itropa` crate wires these pieces to a
//! content generator and a repository.

pub mod error;
pub mod history;
pub mod models;
pub mod tree;
pub mod workspace;

pub use error::{TreeError, TreeResult};
pub use history::{History, HistoryState, DEFAULT_CAPACITY};
pub use workspace::{Workspace, WorkspaceSnapshot};
