//! The language core and its host.
//!
//! [`LanguageCore`] is what an LSP frontend talks to. [`AnalysisHost`]
//! implements it on top of the [`DocumentStore`]: analysis runs outside any
//! lock, and the debounce sleep is the only point where a change waits.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::config::HostConfig;
use super::folding::{FoldingRange, folding_ranges};
use super::goto::{NavigationTarget, goto_definition};
use super::hover::{HoverResult, hover};
use super::references::reference_target;
use super::store::{ChangeOutcome, DiagnosticsEvent, Document, DocumentState, DocumentStore};
use super::symbols::{SymbolInfo, document_symbols, workspace_symbols};
use crate::base::{FileId, LineCol, TextSize};
use crate::hir::{
    BuildOptions, Declaration, Diagnostic, FileAnalysis, InternalFault, Reference, SymbolIndex,
    analyze,
};

/// Document lifecycle and cross-document queries.
pub trait LanguageCore: Send + Sync {
    /// Open a document and return its diagnostics.
    fn open_document(&self, uri: &str, text: &str, version: i32) -> Vec<Diagnostic>;

    /// Replace the text of an open document.
    ///
    /// Resolves once the change is committed, superseded by a newer change,
    /// or rejected.
    fn change_document(
        &self,
        uri: &str,
        text: &str,
        version: i32,
    ) -> impl Future<Output = ChangeOutcome> + Send;

    /// Close a document. Returns `false` if it was not open.
    fn close_document(&self, uri: &str) -> bool;

    fn resolve_symbol(&self, qualified_name: &str) -> Option<Declaration>;

    /// References to `decl` in every open document.
    fn find_references(&self, decl: &Declaration) -> Vec<Reference>;
}

/// The analysis host: configuration plus the document store.
pub struct AnalysisHost {
    config: HostConfig,
    options: BuildOptions,
    store: DocumentStore,
}

impl AnalysisHost {
    pub fn new(config: HostConfig) -> Self {
        let options = config.build_options();
        let store = DocumentStore::new(config.event_capacity);
        Self {
            config,
            options,
            store,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub(crate) fn analyze(&self, file: FileId, text: &str) -> Result<FileAnalysis, InternalFault> {
        analyze(file, text, &self.options)
    }

    // ------------------------------------------------------------------
    // Document state
    // ------------------------------------------------------------------

    /// The stored diagnostics of a document; empty if it is not open.
    pub fn diagnostics(&self, uri: &str) -> Vec<Diagnostic> {
        self.store
            .diagnostics(uri)
            .map(|d| d.to_vec())
            .unwrap_or_default()
    }

    pub fn document_version(&self, uri: &str) -> Option<i32> {
        self.store.document_version(uri)
    }

    pub fn document_state(&self, uri: &str) -> Option<DocumentState> {
        self.store.document_state(uri)
    }

    pub fn uri(&self, file: FileId) -> Option<Arc<str>> {
        self.store.uri(file)
    }

    /// Diagnostics events for every commit and every dependent refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosticsEvent> {
        self.store.subscribe()
    }

    // ------------------------------------------------------------------
    // IDE queries
    // ------------------------------------------------------------------

    pub fn goto_definition(&self, uri: &str, position: LineCol) -> Option<NavigationTarget> {
        self.at_position(uri, position, goto_definition)
    }

    /// References to the declaration under the cursor, which may be a
    /// declaration name or a resolved reference.
    pub fn references_at(&self, uri: &str, position: LineCol) -> Vec<Reference> {
        // The index lock is released before the store scans the documents.
        match self.at_position(uri, position, reference_target) {
            Some(decl) => self.store.find_references(&decl),
            None => Vec::new(),
        }
    }

    pub fn hover(&self, uri: &str, position: LineCol) -> Option<HoverResult> {
        self.at_position(uri, position, hover)
    }

    pub fn document_symbols(&self, uri: &str) -> Vec<SymbolInfo> {
        self.store
            .with_document(uri, |document, _| document_symbols(document))
            .unwrap_or_default()
    }

    pub fn workspace_symbols(&self, query: &str) -> Vec<SymbolInfo> {
        self.store.with_index(|index| workspace_symbols(index, query))
    }

    pub fn folding_ranges(&self, uri: &str) -> Vec<FoldingRange> {
        self.store
            .with_document(uri, |document, _| folding_ranges(document))
            .unwrap_or_default()
    }

    /// Cancel pending changes and drop every document and index entry.
    pub fn shutdown(self) {
        tracing::debug!(documents = self.store.document_count(), "shutting down");
        self.store.clear();
    }

    fn at_position<R>(
        &self,
        uri: &str,
        position: LineCol,
        query: impl FnOnce(&Document, &SymbolIndex, TextSize) -> Option<R>,
    ) -> Option<R> {
        self.store
            .with_document(uri, |document, index| {
                let offset = document.line_index.offset(position)?;
                query(document, index, offset)
            })
            .flatten()
    }
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl LanguageCore for AnalysisHost {
    fn open_document(&self, uri: &str, text: &str, version: i32) -> Vec<Diagnostic> {
        let uri: Arc<str> = uri.into();
        let text: Arc<str> = text.into();
        loop {
            // A close racing this open releases the id; allocate again.
            let file = self.store.allocate(&uri);
            let analysis = self.analyze(file, &text);
            if let Some(diagnostics) =
                self.store
                    .open(uri.clone(), file, version, text.clone(), analysis)
            {
                return diagnostics.to_vec();
            }
        }
    }

    async fn change_document(&self, uri: &str, text: &str, version: i32) -> ChangeOutcome {
        let ticket = match self.store.begin_change(uri, version) {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };

        if !self.config.debounce.is_zero() {
            tokio::select! {
                biased;
                _ = ticket.token().cancelled() => {
                    tracing::trace!(%uri, version, "change superseded while debouncing");
                    return ChangeOutcome::Superseded;
                }
                _ = tokio::time::sleep(self.config.debounce) => {}
            }
        }

        if !self.store.mark_parsing(&ticket) {
            return ChangeOutcome::Superseded;
        }
        let text: Arc<str> = text.into();
        let analysis = self.analyze(ticket.file, &text);
        self.store.complete_change(&ticket, text, analysis)
    }

    fn close_document(&self, uri: &str) -> bool {
        self.store.close(uri)
    }

    fn resolve_symbol(&self, qualified_name: &str) -> Option<Declaration> {
        self.store.resolve_symbol(qualified_name)
    }

    fn find_references(&self, decl: &Declaration) -> Vec<Reference> {
        self.store.find_references(decl)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hir::DeclKind;

    fn host() -> AnalysisHost {
        AnalysisHost::new(HostConfig::new().with_debounce(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_change_without_debounce_publishes() {
        let host = host();
        host.open_document("file:///a.services", "service A { op one() }", 1);

        let outcome = host
            .change_document("file:///a.services", "service A { op two() }", 2)
            .await;

        assert!(matches!(outcome, ChangeOutcome::Published(ref d) if d.is_empty()));
        assert!(host.resolve_symbol("A.two").is_some());
        assert!(host.resolve_symbol("A.one").is_none());
        assert_eq!(host.document_state("file:///a.services"), Some(DocumentState::Resolved));
    }

    #[test]
    fn test_queries_on_unknown_document() {
        let host = host();
        let origin = LineCol::default();
        assert!(host.diagnostics("file:///missing").is_empty());
        assert!(host.goto_definition("file:///missing", origin).is_none());
        assert!(host.hover("file:///missing", origin).is_none());
        assert!(host.references_at("file:///missing", origin).is_empty());
        assert!(host.document_symbols("file:///missing").is_empty());
        assert!(host.folding_ranges("file:///missing").is_empty());
    }

    #[test]
    fn test_goto_and_hover() {
        let host = host();
        let uri = "file:///a.services";
        host.open_document(uri, "service A {\n  type T {}\n  op f(): T\n}", 1);

        // `T` in the return type, line 2 (0-indexed).
        let at_ref = LineCol { line: 2, col: 10 };
        let target = host.goto_definition(uri, at_ref).unwrap();
        assert_eq!(target.qualified_name, "A.T");
        assert_eq!(target.kind, DeclKind::Type);

        let hover = host.hover(uri, at_ref).unwrap();
        assert!(hover.contents.contains("type T"));
        assert!(hover.contents.contains("`A.T`"));
        assert_eq!(hover.kind, Some(DeclKind::Type));

        let refs = host.references_at(uri, LineCol { line: 1, col: 7 });
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_symbols_and_folding() {
        let host = host();
        let uri = "file:///a.services";
        host.open_document(uri, "/* one\n two */\nservice A {\n  op f()\n}", 1);

        let names: Vec<_> = host
            .document_symbols(uri)
            .into_iter()
            .map(|s| s.qualified_name)
            .collect();
        assert_eq!(names, ["A", "A.f"]);
        assert_eq!(host.workspace_symbols("a.F").len(), 1);

        let folds = host.folding_ranges(uri);
        assert_eq!(folds.len(), 2);
        assert!(folds[0].is_comment);
        assert_eq!((folds[1].start_line, folds[1].end_line), (2, 4));
    }

    #[test]
    fn test_shutdown_cancels_pending_changes() {
        let host = host();
        host.open_document("file:///a.services", "service A { op f() }", 1);
        let ticket = host.store().begin_change("file:///a.services", 2).unwrap();

        host.shutdown();
        assert!(ticket.is_cancelled());
    }
}
