//! Edit buffering and single-pass merge into the chunk log.
//!
//! Content producers enqueue world-space edits into an [`EditBuffer`]. A merge
//! pass sorts them into canonical chunk order and streams the on-disk log once,
//! applying every edit to the one record it targets and swapping the rewritten
//! log in atomically.

pub mod edit;
pub mod merge;
pub mod world;

pub use edit::{Edit, EditBuffer, EditError, PreparedEdits};
pub use merge::{MergeEngine, MergeError, MergeReport};
pub use world::World;
