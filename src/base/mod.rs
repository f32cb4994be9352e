//! Foundation types shared by every layer of the core.
//!
//! - [`FileId`] - handle for an open document
//! - [`TextRange`], [`TextSize`] - byte positions in a document snapshot
//! - [`LineCol`], [`LineIndex`] - line/column conversion
//!
//! This module has NO dependencies on other crate modules.

mod file_id;
mod span;

pub use file_id::FileId;
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
