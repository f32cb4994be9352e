//! High-level IR: the semantic layer.
//!
//! ```text
//! SyntaxNode ──builder──▶ SemanticModel ──resolve──▶ resolved references
//!                              │                            │
//!                              └──────▶ SymbolIndex ◀───────┘
//! ```
//!
//! - [`builder`] turns one document's tree into declarations and unresolved
//!   references.
//! - [`resolve`] binds references against the document and the global
//!   [`SymbolIndex`].
//! - [`diagnostics`] holds the diagnostic types and the aggregator.

mod analysis;
mod builder;
mod diagnostics;
mod error;
mod ids;
mod model;
mod resolve;
mod source;

pub use analysis::{FileAnalysis, analyze};
pub use builder::{BuildOptions, ModelBuilder, build};
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, Phase, RelatedInfo, Severity, aggregate, codes,
};
pub use error::InternalFault;
pub use ids::{DeclId, LocalDeclId};
pub use model::{
    BrokenReason, DeclKind, Declaration, Import, PATH_SEPARATOR, RefKind, Reference, Resolution,
    ResolvedTarget, SemanticModel, parent_scope, qualify, scope_chain,
};
pub use resolve::{Resolver, SymbolIndex, depends_on, name_segments, resolve};
pub use source::FileSet;
