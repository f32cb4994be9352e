//! IDE features: the language core and the queries behind LSP handlers.
//!
//! This module sits between the semantic model (HIR) and an LSP server.
//! Document lifecycle goes through [`LanguageCore`]; each query function
//! corresponds to an LSP request.
//!
//! ## Design Principles
//!
//! 1. **Pure queries**: take a document and the index, return data
//! 2. **No LSP types**: positions are [`LineCol`](crate::LineCol), converted at the LSP boundary
//! 3. **One writer per commit**: the store serializes commits, readers never block analysis
//!
//! ## Usage
//!
//! ```ignore
//! use servicedsl::{AnalysisHost, HostConfig, LanguageCore};
//!
//! let host = AnalysisHost::new(HostConfig::default());
//! host.open_document("file:///billing.services", "service Billing { op charge() }", 1);
//!
//! let outcome = host
//!     .change_document("file:///billing.services", "service Billing { op refund() }", 2)
//!     .await;
//! ```

mod analysis;
mod config;
mod folding;
mod goto;
mod hover;
mod references;
mod store;
mod symbols;

pub use analysis::{AnalysisHost, LanguageCore};
pub use config::{DEFAULT_DEBOUNCE, DEFAULT_EXTENSIONS, HostConfig};
pub use folding::{FoldingRange, folding_ranges};
pub use goto::{NavigationTarget, declaration_at, goto_definition};
pub use hover::{HoverResult, hover};
pub use references::reference_target;
pub use store::{
    ChangeOutcome, ChangeTicket, DiagnosticsEvent, Document, DocumentState, DocumentStore,
    PreparedDocument,
};
pub use symbols::{SymbolInfo, document_symbols, workspace_symbols};
