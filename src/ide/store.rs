//! Incremental document store.
//!
//! Owns every open document and the global [`SymbolIndex`]. Analysis
//! (parse + build) happens outside the store; the store only decides whether
//! a finished analysis may still be committed, and commits it atomically.
//!
//! Lock order is always `documents` → `index`.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::base::{FileId, LineIndex, TextRange};
use crate::hir::{
    Declaration, Diagnostic, FileAnalysis, FileSet, InternalFault, Reference,
    SemanticModel, SymbolIndex, aggregate, depends_on, name_segments, resolve,
};
use crate::parser::{Parse, parse};

/// Analysis state of an open document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentState {
    /// An edit was accepted and is waiting for analysis.
    Dirty,
    /// The accepted edit is being parsed and built.
    Parsing,
    /// The latest accepted edit is committed.
    Resolved,
}

/// The committed snapshot of one document.
#[derive(Clone, Debug)]
pub struct Document {
    pub uri: Arc<str>,
    pub file: FileId,
    /// Version of `text`.
    pub version: i32,
    pub text: Arc<str>,
    pub parse: Parse,
    pub line_index: LineIndex,
    pub model: SemanticModel,
    syntax: Vec<Diagnostic>,
    semantic: Vec<Diagnostic>,
    resolution: Vec<Diagnostic>,
    internal: Vec<Diagnostic>,
    diagnostics: Arc<[Diagnostic]>,
}

impl Document {
    /// The aggregated report, as last published.
    pub fn diagnostics(&self) -> &Arc<[Diagnostic]> {
        &self.diagnostics
    }

    fn reaggregate(&mut self) {
        self.diagnostics = aggregate(
            [
                &self.syntax[..],
                &self.semantic[..],
                &self.resolution[..],
                &self.internal[..],
            ],
            &self.line_index,
        )
        .into();
    }
}

#[derive(Debug)]
struct DocumentEntry {
    document: Document,
    state: DocumentState,
    /// Highest version accepted so far; may be ahead of `document.version`.
    latest_version: i32,
    pending: Option<CancellationToken>,
}

impl DocumentEntry {
    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

/// Permission to commit one accepted edit.
///
/// Cancelled as soon as a newer edit of the same document is accepted or
/// the document is closed.
#[derive(Clone, Debug)]
pub struct ChangeTicket {
    pub uri: Arc<str>,
    pub file: FileId,
    pub version: i32,
    token: CancellationToken,
}

impl ChangeTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// What became of a `change_document` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Committed; the document's new diagnostics.
    Published(Vec<Diagnostic>),
    /// A newer edit arrived first; nothing was committed.
    Superseded,
    /// The version was not newer than `current`; nothing changed.
    Stale { current: i32 },
    NotOpen,
}

/// Published after every commit, close and dependent re-resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticsEvent {
    pub uri: Arc<str>,
    pub version: i32,
    pub diagnostics: Arc<[Diagnostic]>,
}

/// A document analyzed ahead of a bulk commit.
#[derive(Debug)]
pub struct PreparedDocument {
    pub uri: Arc<str>,
    pub file: FileId,
    pub version: i32,
    pub text: Arc<str>,
    pub analysis: Result<FileAnalysis, InternalFault>,
}

type Documents = FxHashMap<FileId, DocumentEntry>;

pub struct DocumentStore {
    files: FileSet,
    documents: RwLock<Documents>,
    index: RwLock<SymbolIndex>,
    events: broadcast::Sender<DiagnosticsEvent>,
}

impl DocumentStore {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            files: FileSet::new(),
            documents: RwLock::new(FxHashMap::default()),
            index: RwLock::new(SymbolIndex::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosticsEvent> {
        self.events.subscribe()
    }

    /// The `FileId` a URI is (or will be) stored under.
    pub fn allocate(&self, uri: &str) -> FileId {
        self.files.file_id(uri)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Commit a freshly opened document. Reopening replaces the old state.
    ///
    /// Returns `None` without committing when `file` is no longer the id
    /// of `uri`, i.e. the document was closed after `file` was allocated.
    /// The caller allocates again and re-analyzes.
    pub fn open(
        &self,
        uri: Arc<str>,
        file: FileId,
        version: i32,
        text: Arc<str>,
        analysis: Result<FileAnalysis, InternalFault>,
    ) -> Option<Arc<[Diagnostic]>> {
        let mut documents = self.documents.write();
        if self.files.lookup(&uri) != Some(file) {
            tracing::debug!(%uri, ?file, "file id released before open");
            return None;
        }
        if let Some(entry) = documents.get_mut(&file) {
            entry.cancel_pending();
            entry.latest_version = version;
        }
        tracing::debug!(%uri, version, "open document");
        Some(self.commit_locked(&mut documents, uri, file, version, text, analysis))
    }

    /// Accept an edit: bump the version, cancel older pending work.
    pub fn begin_change(&self, uri: &str, version: i32) -> Result<ChangeTicket, ChangeOutcome> {
        let Some(file) = self.files.lookup(uri) else {
            return Err(ChangeOutcome::NotOpen);
        };
        let mut documents = self.documents.write();
        let Some(entry) = documents.get_mut(&file) else {
            return Err(ChangeOutcome::NotOpen);
        };
        if version <= entry.latest_version {
            tracing::debug!(uri, version, current = entry.latest_version, "stale change rejected");
            return Err(ChangeOutcome::Stale {
                current: entry.latest_version,
            });
        }

        entry.cancel_pending();
        let token = CancellationToken::new();
        entry.pending = Some(token.clone());
        entry.latest_version = version;
        entry.state = DocumentState::Dirty;

        Ok(ChangeTicket {
            uri: entry.document.uri.clone(),
            file,
            version,
            token,
        })
    }

    /// Record that the ticket's analysis started. False if it is obsolete.
    pub fn mark_parsing(&self, ticket: &ChangeTicket) -> bool {
        let mut documents = self.documents.write();
        match documents.get_mut(&ticket.file) {
            Some(entry) if !ticket.is_cancelled() && entry.latest_version == ticket.version => {
                entry.state = DocumentState::Parsing;
                true
            }
            _ => false,
        }
    }

    /// Commit an analysis for `ticket` unless a newer edit superseded it.
    pub fn complete_change(
        &self,
        ticket: &ChangeTicket,
        text: Arc<str>,
        analysis: Result<FileAnalysis, InternalFault>,
    ) -> ChangeOutcome {
        let mut documents = self.documents.write();
        let Some(entry) = documents.get(&ticket.file) else {
            return ChangeOutcome::NotOpen;
        };
        if ticket.is_cancelled() || entry.latest_version != ticket.version {
            tracing::trace!(uri = %ticket.uri, version = ticket.version, "discarding superseded analysis");
            return ChangeOutcome::Superseded;
        }

        let diagnostics = self.commit_locked(
            &mut documents,
            ticket.uri.clone(),
            ticket.file,
            ticket.version,
            text,
            analysis,
        );
        ChangeOutcome::Published(diagnostics.to_vec())
    }

    /// Close a document, removing its declarations from the index.
    pub fn close(&self, uri: &str) -> bool {
        let Some(file) = self.files.lookup(uri) else {
            return false;
        };
        let mut documents = self.documents.write();
        let Some(mut entry) = documents.remove(&file) else {
            return false;
        };
        entry.cancel_pending();

        let mut index = self.index.write();
        let removed = index.remove_file(file);
        let index = RwLockWriteGuard::downgrade(index);

        let mut events = vec![DiagnosticsEvent {
            uri: entry.document.uri.clone(),
            version: entry.latest_version,
            diagnostics: Vec::new().into(),
        }];
        events.extend(refresh_dependents(
            &mut documents,
            &[file],
            &name_segments(&removed),
            &index,
        ));
        drop(index);
        self.files.remove(file);

        tracing::debug!(uri, removed = removed.len(), dependents = events.len() - 1, "close document");
        self.publish(events);
        true
    }

    /// Commit many analyzed documents at once: index all of them, then
    /// resolve each. Returns the events published for them.
    ///
    /// Documents that are already open keep their editor state and are left
    /// out, as are documents whose `FileId` was released meanwhile.
    pub fn open_bulk(&self, prepared: Vec<PreparedDocument>) -> Vec<DiagnosticsEvent> {
        let mut documents = self.documents.write();
        let prepared: Vec<PreparedDocument> = prepared
            .into_iter()
            .filter(|item| {
                if documents.contains_key(&item.file) {
                    tracing::trace!(uri = %item.uri, "already open, skipping bulk copy");
                    return false;
                }
                self.files.lookup(&item.uri) == Some(item.file)
            })
            .collect();
        let mut index = self.index.write();

        let changed: Vec<FileId> = prepared.iter().map(|p| p.file).collect();
        let mut segments = FxHashSet::default();
        for item in &prepared {
            if let Ok(analysis) = &item.analysis {
                let old = index.replace_file(item.file, &analysis.model.declarations);
                segments.extend(name_segments(&old));
                segments.extend(name_segments(&analysis.model.declarations));
            }
        }
        let index = RwLockWriteGuard::downgrade(index);

        let mut events = refresh_dependents(&mut documents, &changed, &segments, &index);
        let mut loaded = Vec::with_capacity(prepared.len());
        for item in prepared {
            let document = match item.analysis {
                Ok(analysis) => resolved_document(item.uri, item.file, item.version, item.text, analysis, &index),
                Err(fault) => faulted_document(item.uri, item.file, item.version, item.text, &fault),
            };
            let event = DiagnosticsEvent {
                uri: document.uri.clone(),
                version: document.version,
                diagnostics: document.diagnostics.clone(),
            };
            insert_committed(&mut documents, document);
            loaded.push(event);
        }
        drop(index);

        tracing::debug!(documents = loaded.len(), dependents = events.len(), "bulk open");
        events.extend(loaded.iter().cloned());
        self.publish(events);
        loaded
    }

    /// Drop everything: cancel pending work, clear documents and index.
    pub fn clear(&self) {
        let mut documents = self.documents.write();
        for entry in documents.values_mut() {
            entry.cancel_pending();
        }
        documents.clear();
        self.index.write().clear();
        self.files.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_open(&self, uri: &str) -> bool {
        self.files
            .lookup(uri)
            .is_some_and(|file| self.documents.read().contains_key(&file))
    }

    pub fn diagnostics(&self, uri: &str) -> Option<Arc<[Diagnostic]>> {
        self.with_entry(uri, |entry| entry.document.diagnostics.clone())
    }

    /// Latest accepted version.
    pub fn document_version(&self, uri: &str) -> Option<i32> {
        self.with_entry(uri, |entry| entry.latest_version)
    }

    pub fn document_state(&self, uri: &str) -> Option<DocumentState> {
        self.with_entry(uri, |entry| entry.state)
    }

    pub fn uri(&self, file: FileId) -> Option<Arc<str>> {
        self.files.uri(file)
    }

    fn with_entry<R>(&self, uri: &str, f: impl FnOnce(&DocumentEntry) -> R) -> Option<R> {
        let file = self.files.lookup(uri)?;
        self.documents.read().get(&file).map(f)
    }

    pub fn file_id(&self, uri: &str) -> Option<FileId> {
        self.files.lookup(uri)
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Run `f` on a committed document and the index.
    pub fn with_document<R>(
        &self,
        uri: &str,
        f: impl FnOnce(&Document, &SymbolIndex) -> R,
    ) -> Option<R> {
        let file = self.files.lookup(uri)?;
        let documents = self.documents.read();
        let entry = documents.get(&file)?;
        let index = self.index.read();
        Some(f(&entry.document, &index))
    }

    pub fn with_index<R>(&self, f: impl FnOnce(&SymbolIndex) -> R) -> R {
        f(&self.index.read())
    }

    pub fn resolve_symbol(&self, qualified_name: &str) -> Option<Declaration> {
        self.index.read().lookup_qualified(qualified_name).cloned()
    }

    /// References to `decl` across all open documents, by document then
    /// position.
    pub fn find_references(&self, decl: &Declaration) -> Vec<Reference> {
        let documents = self.documents.read();
        let mut found: Vec<Reference> = documents
            .values()
            .flat_map(|entry| entry.document.model.references.iter())
            .filter(|r| r.target().is_some_and(|t| t.id == decl.id))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.file, r.range.start()));
        found
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    fn commit_locked(
        &self,
        documents: &mut Documents,
        uri: Arc<str>,
        file: FileId,
        version: i32,
        text: Arc<str>,
        analysis: Result<FileAnalysis, InternalFault>,
    ) -> Arc<[Diagnostic]> {
        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(fault) => return self.commit_fault(documents, uri, file, version, text, &fault),
        };

        let mut index = self.index.write();
        let old = index.replace_file(file, &analysis.model.declarations);
        let index = RwLockWriteGuard::downgrade(index);

        let mut segments = name_segments(&old);
        segments.extend(name_segments(&analysis.model.declarations));

        let document = resolved_document(uri, file, version, text, analysis, &index);
        let diagnostics = document.diagnostics.clone();
        let mut events = vec![DiagnosticsEvent {
            uri: document.uri.clone(),
            version,
            diagnostics: diagnostics.clone(),
        }];
        events.extend(refresh_dependents(documents, &[file], &segments, &index));
        drop(index);

        tracing::debug!(
            uri = %document.uri,
            version,
            declarations = document.model.declarations.len(),
            diagnostics = diagnostics.len(),
            dependents = events.len() - 1,
            "commit"
        );
        insert_committed(documents, document);
        self.publish(events);
        diagnostics
    }

    /// Keep the previous good state; add one internal diagnostic.
    fn commit_fault(
        &self,
        documents: &mut Documents,
        uri: Arc<str>,
        file: FileId,
        version: i32,
        text: Arc<str>,
        fault: &InternalFault,
    ) -> Arc<[Diagnostic]> {
        tracing::warn!(%uri, version, error = %fault, "internal fault, keeping previous analysis");

        let (version, diagnostics) = match documents.get_mut(&file) {
            Some(entry) => {
                entry.document.internal = vec![fault_diagnostic(fault)];
                entry.document.reaggregate();
                entry.state = DocumentState::Resolved;
                entry.pending = None;
                (entry.latest_version, entry.document.diagnostics.clone())
            }
            None => {
                let document = faulted_document(uri.clone(), file, version, text, fault);
                let diagnostics = document.diagnostics.clone();
                insert_committed(documents, document);
                (version, diagnostics)
            }
        };

        self.publish(vec![DiagnosticsEvent {
            uri,
            version,
            diagnostics: diagnostics.clone(),
        }]);
        diagnostics
    }

    fn publish(&self, events: Vec<DiagnosticsEvent>) {
        for event in events {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(256)
    }
}

fn resolved_document(
    uri: Arc<str>,
    file: FileId,
    version: i32,
    text: Arc<str>,
    analysis: FileAnalysis,
    index: &SymbolIndex,
) -> Document {
    let FileAnalysis {
        parse,
        line_index,
        mut model,
        syntax_diagnostics,
        semantic_diagnostics,
    } = analysis;
    let resolution = resolve(&mut model, index);

    let mut document = Document {
        uri,
        file,
        version,
        text,
        parse,
        line_index,
        model,
        syntax: syntax_diagnostics,
        semantic: semantic_diagnostics,
        resolution,
        internal: Vec::new(),
        diagnostics: Vec::new().into(),
    };
    document.reaggregate();
    document
}

/// A document whose first analysis failed: empty model, one diagnostic.
fn faulted_document(
    uri: Arc<str>,
    file: FileId,
    version: i32,
    text: Arc<str>,
    fault: &InternalFault,
) -> Document {
    let mut document = Document {
        uri,
        file,
        version,
        parse: parse(&text),
        line_index: LineIndex::new(&text),
        text,
        model: SemanticModel::empty(file),
        syntax: Vec::new(),
        semantic: Vec::new(),
        resolution: Vec::new(),
        internal: vec![fault_diagnostic(fault)],
        diagnostics: Vec::new().into(),
    };
    document.reaggregate();
    document
}

fn fault_diagnostic(fault: &InternalFault) -> Diagnostic {
    let range = fault.range().unwrap_or_else(|| TextRange::empty(0.into()));
    Diagnostic::internal(range, &fault.to_string())
}

fn insert_committed(documents: &mut Documents, document: Document) {
    match documents.get_mut(&document.file) {
        Some(entry) => {
            entry.latest_version = entry.latest_version.max(document.version);
            entry.document = document;
            entry.state = DocumentState::Resolved;
            entry.pending = None;
        }
        None => {
            documents.insert(
                document.file,
                DocumentEntry {
                    latest_version: document.version,
                    document,
                    state: DocumentState::Resolved,
                    pending: None,
                },
            );
        }
    }
}

/// Re-resolve every document that may see different targets now.
fn refresh_dependents(
    documents: &mut Documents,
    changed: &[FileId],
    segments: &FxHashSet<SmolStr>,
    index: &SymbolIndex,
) -> Vec<DiagnosticsEvent> {
    let mut events = Vec::new();
    for entry in documents.values_mut() {
        let document = &mut entry.document;
        if !depends_on(&document.model, changed, segments) {
            continue;
        }
        document.resolution = resolve(&mut document.model, index);
        document.reaggregate();
        events.push(DiagnosticsEvent {
            uri: document.uri.clone(),
            version: document.version,
            diagnostics: document.diagnostics.clone(),
        });
    }
    events.sort_by(|a, b| a.uri.cmp(&b.uri));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{BuildOptions, Phase, analyze, codes};
    use crate::parser::SyntaxKind;

    fn open(store: &DocumentStore, uri: &str, version: i32, text: &str) -> Arc<[Diagnostic]> {
        let file = store.allocate(uri);
        let analysis = analyze(file, text, &BuildOptions::default());
        store
            .open(uri.into(), file, version, text.into(), analysis)
            .unwrap()
    }

    fn change(store: &DocumentStore, uri: &str, version: i32, text: &str) -> ChangeOutcome {
        let ticket = match store.begin_change(uri, version) {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };
        let analysis = analyze(ticket.file, text, &BuildOptions::default());
        store.complete_change(&ticket, text.into(), analysis)
    }

    fn codes_of(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter_map(|d| d.code.as_deref())
            .collect()
    }

    fn text_of(store: &DocumentStore, uri: &str) -> String {
        store
            .with_document(uri, |doc, _| doc.text.to_string())
            .unwrap()
    }

    #[test]
    fn test_open_indexes_and_publishes() {
        let store = DocumentStore::default();
        let mut events = store.subscribe();

        let diagnostics = open(&store, "file:///a.services", 1, "service A { op foo() }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert!(store.resolve_symbol("A.foo").is_some());
        assert_eq!(store.document_state("file:///a.services"), Some(DocumentState::Resolved));
        assert_eq!(store.document_version("file:///a.services"), Some(1));

        let event = events.try_recv().unwrap();
        assert_eq!(&*event.uri, "file:///a.services");
        assert_eq!(event.version, 1);
    }

    #[test]
    fn test_stale_change_is_noop() {
        let store = DocumentStore::default();
        open(&store, "file:///a.services", 2, "service A { op foo() }");
        let before = store.diagnostics("file:///a.services").unwrap();

        assert_eq!(
            change(&store, "file:///a.services", 2, "service B { op bar() }"),
            ChangeOutcome::Stale { current: 2 }
        );
        assert_eq!(
            change(&store, "file:///a.services", 1, "service B { op bar() }"),
            ChangeOutcome::Stale { current: 2 }
        );

        assert_eq!(text_of(&store, "file:///a.services"), "service A { op foo() }");
        assert_eq!(store.diagnostics("file:///a.services").unwrap(), before);
        assert!(store.resolve_symbol("B").is_none());
        assert_eq!(store.document_state("file:///a.services"), Some(DocumentState::Resolved));
    }

    #[test]
    fn test_change_not_open() {
        let store = DocumentStore::default();
        assert_eq!(
            change(&store, "file:///missing.services", 1, ""),
            ChangeOutcome::NotOpen
        );
    }

    #[test]
    fn test_superseded_ticket_is_discarded() {
        let store = DocumentStore::default();
        let uri = "file:///a.services";
        open(&store, uri, 1, "service A { op one() }");

        let older = store.begin_change(uri, 2).unwrap();
        let newer = store.begin_change(uri, 3).unwrap();
        assert!(older.is_cancelled());
        assert!(!store.mark_parsing(&older));
        assert_eq!(store.document_state(uri), Some(DocumentState::Dirty));

        let analysis = analyze(older.file, "service A { op two() }", &BuildOptions::default());
        assert_eq!(
            store.complete_change(&older, "service A { op two() }".into(), analysis),
            ChangeOutcome::Superseded
        );
        assert!(store.resolve_symbol("A.two").is_none());

        assert!(store.mark_parsing(&newer));
        assert_eq!(store.document_state(uri), Some(DocumentState::Parsing));
        let analysis = analyze(newer.file, "service A { op three() }", &BuildOptions::default());
        assert!(matches!(
            store.complete_change(&newer, "service A { op three() }".into(), analysis),
            ChangeOutcome::Published(_)
        ));
        assert!(store.resolve_symbol("A.three").is_some());
        assert!(store.resolve_symbol("A.one").is_none());
        assert_eq!(store.document_version(uri), Some(3));
        assert_eq!(store.document_state(uri), Some(DocumentState::Resolved));
    }

    #[test]
    fn test_internal_fault_keeps_previous_state() {
        let store = DocumentStore::default();
        let uri = "file:///a.services";
        open(&store, uri, 1, "service A { op foo() }");

        let ticket = store.begin_change(uri, 2).unwrap();
        let fault = InternalFault::UnexpectedRoot {
            found: SyntaxKind::SERVICE,
        };
        let ChangeOutcome::Published(diagnostics) =
            store.complete_change(&ticket, "service B {}".into(), Err(fault))
        else {
            panic!("fault should still publish");
        };

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].phase, Phase::Internal);
        assert_eq!(diagnostics[0].code.as_deref(), Some(codes::INTERNAL_FAULT));
        assert_eq!(text_of(&store, uri), "service A { op foo() }");
        assert!(store.resolve_symbol("A.foo").is_some());
        assert!(store.resolve_symbol("B").is_none());
        assert_eq!(store.document_version(uri), Some(2));

        // The next good analysis clears it.
        let ChangeOutcome::Published(diagnostics) = change(&store, uri, 3, "service A { op bar() }")
        else {
            panic!("expected a commit");
        };
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_internal_fault_on_open() {
        let store = DocumentStore::default();
        let file = store.allocate("file:///a.services");
        let fault = InternalFault::UnexpectedRoot {
            found: SyntaxKind::SERVICE,
        };
        let diagnostics = store.open(
            "file:///a.services".into(),
            file,
            1,
            "service A { op foo() }".into(),
            Err(fault),
        )
        .unwrap();

        assert_eq!(codes_of(&diagnostics), vec![codes::INTERNAL_FAULT]);
        assert!(store.resolve_symbol("A").is_none());
        let declarations = store
            .with_document("file:///a.services", |doc, _| doc.model.declarations.len())
            .unwrap();
        assert_eq!(declarations, 0);
    }

    #[test]
    fn test_close_removes_declarations_and_refreshes_dependents() {
        let store = DocumentStore::default();
        open(&store, "file:///billing.services", 1, "service Billing { op charge() }");
        let orders = open(
            &store,
            "file:///orders.services",
            1,
            "service Orders { op place() calls Billing.charge }",
        );
        assert!(orders.is_empty(), "{orders:?}");

        let mut events = store.subscribe();
        assert!(store.close("file:///billing.services"));
        assert!(!store.close("file:///billing.services"));
        assert!(!store.is_open("file:///billing.services"));
        assert!(store.resolve_symbol("Billing.charge").is_none());

        let orders = store.diagnostics("file:///orders.services").unwrap();
        assert_eq!(codes_of(&orders), vec![codes::UNDEFINED_REFERENCE]);

        let closed = events.try_recv().unwrap();
        assert_eq!(&*closed.uri, "file:///billing.services");
        assert!(closed.diagnostics.is_empty());
        let dependent = events.try_recv().unwrap();
        assert_eq!(&*dependent.uri, "file:///orders.services");
        assert_eq!(dependent.diagnostics, orders);
    }

    #[test]
    fn test_dependents_follow_changes() {
        let store = DocumentStore::default();
        let orders = open(
            &store,
            "file:///orders.services",
            1,
            "service Orders { op place(): Billing.Invoice }",
        );
        assert_eq!(codes_of(&orders), vec![codes::UNDEFINED_REFERENCE]);

        open(&store, "file:///billing.services", 1, "service Billing { type Invoice {} op charge() }");
        assert!(store.diagnostics("file:///orders.services").unwrap().is_empty());

        change(&store, "file:///billing.services", 2, "service Billing { op charge() }");
        let orders = store.diagnostics("file:///orders.services").unwrap();
        assert_eq!(codes_of(&orders), vec![codes::UNDEFINED_REFERENCE]);
    }

    #[test]
    fn test_find_references_across_documents() {
        let store = DocumentStore::default();
        open(&store, "file:///types.data", 1, "type Money = double");
        open(&store, "file:///a.services", 1, "service A { op f(m: Money): Money }");
        open(&store, "file:///b.services", 1, "service B { op g(m: Money) }");

        let money = store.resolve_symbol("Money").unwrap();
        let refs = store.find_references(&money);
        assert_eq!(refs.len(), 3);
        let uris: Vec<_> = refs
            .iter()
            .map(|r| store.uri(r.file).unwrap().to_string())
            .collect();
        assert_eq!(
            uris,
            vec!["file:///a.services", "file:///a.services", "file:///b.services"]
        );
    }

    #[test]
    fn test_open_bulk_resolves_after_indexing_all() {
        let store = DocumentStore::default();
        let docs = [
            ("file:///a.services", "service A { op f(x: T) }"),
            ("file:///t.data", "type T = int"),
        ];
        let prepared = docs
            .iter()
            .map(|(uri, text)| prepared(&store, uri, text))
            .collect();

        let events = store.open_bulk(prepared);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.diagnostics.is_empty()), "{events:?}");
        assert_eq!(store.document_count(), 2);
    }

    fn prepared(store: &DocumentStore, uri: &str, text: &str) -> PreparedDocument {
        let file = store.allocate(uri);
        PreparedDocument {
            uri: uri.into(),
            file,
            version: 0,
            text: text.into(),
            analysis: analyze(file, text, &BuildOptions::default()),
        }
    }

    #[test]
    fn test_open_bulk_skips_open_documents() {
        let store = DocumentStore::default();
        let uri = "file:///a.services";
        open(&store, uri, 5, "service A { op editor() }");
        let ticket = store.begin_change(uri, 6).unwrap();

        let events = store.open_bulk(vec![
            prepared(&store, uri, "service A { op disk() }"),
            prepared(&store, "file:///b.services", "service B { op g() }"),
        ]);

        assert_eq!(events.len(), 1);
        assert_eq!(&*events[0].uri, "file:///b.services");
        assert!(!ticket.is_cancelled());
        assert_eq!(store.document_version(uri), Some(6));
        assert_eq!(store.document_state(uri), Some(DocumentState::Dirty));
        assert_eq!(text_of(&store, uri), "service A { op editor() }");
        assert!(store.resolve_symbol("A.editor").is_some());
        assert!(store.resolve_symbol("A.disk").is_none());
        assert_eq!(store.document_count(), 2);
    }

    #[test]
    fn test_open_after_close_with_released_file_id() {
        let store = DocumentStore::default();
        let uri = "file:///a.services";
        open(&store, uri, 1, "service A { op one() }");

        // Allocated for a reopen, then the document is closed before commit.
        let file = store.allocate(uri);
        let analysis = analyze(file, "service A { op two() }", &BuildOptions::default());
        assert!(store.close(uri));

        let opened = store.open(uri.into(), file, 2, "service A { op two() }".into(), analysis);
        assert!(opened.is_none());
        assert_eq!(store.document_count(), 0);
        assert!(store.resolve_symbol("A.two").is_none());

        // A fresh allocation commits normally.
        open(&store, uri, 2, "service A { op two() }");
        assert!(store.is_open(uri));
        assert_ne!(store.file_id(uri), Some(file));
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn test_open_bulk_drops_released_file_ids() {
        let store = DocumentStore::default();
        let stale = prepared(&store, "file:///a.services", "service A {}");
        store.clear();

        assert!(store.open_bulk(vec![stale]).is_empty());
        assert_eq!(store.document_count(), 0);
        assert!(store.resolve_symbol("A").is_none());
    }

    #[test]
    fn test_clear() {
        let store = DocumentStore::default();
        open(&store, "file:///a.services", 1, "service A { op foo() }");
        let ticket = store.begin_change("file:///a.services", 2).unwrap();

        store.clear();
        assert!(ticket.is_cancelled());
        assert_eq!(store.document_count(), 0);
        assert!(store.resolve_symbol("A").is_none());
        assert!(store.file_id("file:///a.services").is_none());
    }
}
