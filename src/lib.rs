//! # servicedsl-base
//!
//! Language-server core for a service/operation modeling DSL.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project → first load of a workspace directory
//!   ↓
//! ide     → document store, LanguageCore, goto/hover/references/symbols
//!   ↓
//! hir     → semantic model, symbol index, resolver, diagnostics
//!   ↓
//! parser  → logos lexer + rowan syntax tree with error recovery
//!   ↓
//! base    → primitives (FileId, TextRange, LineIndex)
//! ```

/// Foundation types: FileId, TextRange, LineIndex
pub mod base;

/// Lexer and error-recovering parser producing a lossless syntax tree
pub mod parser;

/// Semantic model: declarations, references, symbol index, resolution
pub mod hir;

/// Document store, language core and IDE queries
pub mod ide;

/// Workspace loading
pub mod project;

pub use base::{FileId, LineCol, LineIndex, TextRange, TextSize};
pub use ide::{AnalysisHost, ChangeOutcome, HostConfig, LanguageCore};
