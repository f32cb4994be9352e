//! End-to-end tests for the language core
//!
//! Drives `AnalysisHost` through `LanguageCore` the way an LSP frontend
//! would: open, change, close, and cross-document queries.

use std::time::Duration;

use rstest::rstest;
use servicedsl::hir::{DeclKind, Phase, Severity, aggregate, codes};
use servicedsl::ide::{DocumentState, NavigationTarget};
use servicedsl::{AnalysisHost, ChangeOutcome, HostConfig, LanguageCore, LineCol, LineIndex};

const BILLING: &str = "file:///ws/billing.services";
const ORDERS: &str = "file:///ws/orders.operation";

fn host() -> AnalysisHost {
    AnalysisHost::new(HostConfig::new().with_debounce(Duration::ZERO))
}

fn codes_of(diagnostics: &[servicedsl::hir::Diagnostic]) -> Vec<&str> {
    diagnostics.iter().filter_map(|d| d.code.as_deref()).collect()
}

/// Position of the first occurrence of `needle` in `text`.
fn position_of(text: &str, needle: &str) -> LineCol {
    let offset = text.find(needle).unwrap();
    LineIndex::new(text).line_col((offset as u32).into())
}

// ============================================================================
// BASIC SCENARIOS
// ============================================================================

#[test]
fn test_open_clean_document() {
    let host = host();
    let diagnostics = host.open_document(BILLING, "service A { op foo() }", 1);

    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    let foo = host.resolve_symbol("A.foo").expect("A.foo should be indexed");
    assert_eq!(foo.kind, DeclKind::Operation);
    assert_eq!(host.uri(foo.file).as_deref(), Some(BILLING));
}

#[test]
fn test_duplicate_service_keeps_last() {
    let host = host();
    let diagnostics = host.open_document(BILLING, "service A { op foo() } service A { op bar() }", 1);

    assert_eq!(codes_of(&diagnostics), [codes::DUPLICATE_DEFINITION]);
    // Reported on the shadowed first declaration.
    assert_eq!(diagnostics[0].start, LineCol { line: 0, col: 8 });

    let service = host.resolve_symbol("A").unwrap();
    assert_eq!(service.exports, ["A.bar"]);
    assert!(host.resolve_symbol("A.bar").is_some());
}

#[test]
fn test_undeclared_reference_reports_not_found_at_span() {
    let host = host();
    let text = "service A { op f(): B.qux }";
    let diagnostics = host.open_document(BILLING, text, 1);

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.code.as_deref(), Some(codes::UNDEFINED_REFERENCE));
    assert_eq!(diagnostic.phase, Phase::Resolution);
    assert_eq!(diagnostic.severity, Severity::Error);

    let start = text.find("B.qux").unwrap();
    assert_eq!(usize::from(diagnostic.range.start()), start);
    assert_eq!(usize::from(diagnostic.range.end()), start + "B.qux".len());
}

#[tokio::test(start_paused = true)]
async fn test_fixing_syntax_error_clears_it() {
    let host = AnalysisHost::default();
    let before = host.open_document(BILLING, "service A { op foo( }", 1);
    assert!(before.iter().any(|d| d.phase == Phase::Syntax));

    let outcome = host.change_document(BILLING, "service A { op foo() }", 2).await;

    let ChangeOutcome::Published(after) = outcome else {
        panic!("expected published diagnostics, got {outcome:?}");
    };
    assert!(after.is_empty(), "unexpected: {after:?}");
    assert_eq!(host.diagnostics(BILLING), after);
    assert_eq!(host.document_version(BILLING), Some(2));
    assert_eq!(host.document_state(BILLING), Some(DocumentState::Resolved));
}

// ============================================================================
// VERSIONS AND LIFECYCLE
// ============================================================================

#[rstest]
#[case(1)]
#[case(0)]
#[case(-3)]
#[tokio::test]
async fn test_non_increasing_version_is_stale(#[case] version: i32) {
    let host = host();
    host.open_document(BILLING, "service A { op foo() }", 1);

    let outcome = host.change_document(BILLING, "service B { op bar() }", version).await;

    assert_eq!(outcome, ChangeOutcome::Stale { current: 1 });
    assert!(host.resolve_symbol("A.foo").is_some());
    assert!(host.resolve_symbol("B").is_none());
}

#[tokio::test]
async fn test_change_of_unopened_document() {
    let host = host();
    let outcome = host.change_document(BILLING, "service A {}", 2).await;
    assert_eq!(outcome, ChangeOutcome::NotOpen);
}

#[test]
fn test_close_removes_declarations() {
    let host = host();
    host.open_document(BILLING, "service A { op foo() type T {} }", 1);

    assert!(host.close_document(BILLING));
    assert!(host.resolve_symbol("A").is_none());
    assert!(host.resolve_symbol("A.foo").is_none());
    assert!(host.resolve_symbol("A.T").is_none());
    assert!(host.diagnostics(BILLING).is_empty());
    assert!(!host.close_document(BILLING));
}

#[test]
fn test_stored_diagnostics_are_aggregated_once() {
    let host = host();
    let text = "import Missing.*;\nservice orders {\n  op Place(a: X, a: Y)\n}";
    let diagnostics = host.open_document(ORDERS, text, 1);
    assert!(diagnostics.len() >= 3, "{diagnostics:?}");

    let index = LineIndex::new(text);
    let again = aggregate([diagnostics.as_slice()], &index);
    assert_eq!(again, diagnostics);
    assert_eq!(host.diagnostics(ORDERS), diagnostics);
}

// ============================================================================
// DEBOUNCE
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_supersede_each_other() {
    let host = AnalysisHost::new(HostConfig::new().with_debounce(Duration::from_millis(150)));
    host.open_document(BILLING, "service A { op one() }", 1);

    let (first, second) = tokio::join!(
        host.change_document(BILLING, "service A { op two() }", 2),
        host.change_document(BILLING, "service A { op three() }", 3),
    );

    assert_eq!(first, ChangeOutcome::Superseded);
    assert!(matches!(second, ChangeOutcome::Published(ref d) if d.is_empty()));
    assert!(host.resolve_symbol("A.two").is_none());
    assert!(host.resolve_symbol("A.three").is_some());
    assert_eq!(host.document_version(BILLING), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_close_during_debounce_supersedes() {
    let host = AnalysisHost::default();
    host.open_document(BILLING, "service A { op one() }", 1);

    let change = host.change_document(BILLING, "service A { op two() }", 2);
    let close = async { host.close_document(BILLING) };
    let (outcome, closed) = tokio::join!(change, close);

    assert!(closed);
    assert_eq!(outcome, ChangeOutcome::Superseded);
    assert!(host.resolve_symbol("A.two").is_none());
}

// ============================================================================
// CROSS-DOCUMENT
// ============================================================================

#[tokio::test]
async fn test_dependents_follow_changes_and_close() {
    let host = host();
    let orders = "service Orders { op place(): Billing.Invoice }";
    let unresolved = host.open_document(ORDERS, orders, 1);
    assert_eq!(codes_of(&unresolved), [codes::UNDEFINED_REFERENCE]);

    let mut events = host.subscribe();
    host.open_document(BILLING, "service Billing { type Invoice {} op charge() }", 1);
    assert!(host.diagnostics(ORDERS).is_empty());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.uri.to_string());
    }
    assert!(seen.contains(&ORDERS.to_string()));
    assert!(seen.contains(&BILLING.to_string()));

    host.change_document(BILLING, "service Billing { op charge() }", 2).await;
    assert_eq!(codes_of(&host.diagnostics(ORDERS)), [codes::UNDEFINED_REFERENCE]);

    host.change_document(BILLING, "service Billing { type Invoice {} }", 3).await;
    assert!(host.diagnostics(ORDERS).is_empty());

    host.close_document(BILLING);
    assert_eq!(codes_of(&host.diagnostics(ORDERS)), [codes::UNDEFINED_REFERENCE]);
}

#[test]
fn test_imports_resolve_across_documents() {
    let host = host();
    host.open_document(BILLING, "service Billing { type Invoice {} op charge() }", 1);
    let diagnostics = host.open_document(
        ORDERS,
        "import Billing.*;\nservice Orders { op place(): Invoice calls charge }",
        1,
    );
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
}

#[test]
fn test_goto_definition_across_documents() {
    let host = host();
    host.open_document(BILLING, "service Billing {\n  type Invoice { total: int }\n}", 1);
    let orders = "service Orders {\n  op place(): Billing.Invoice\n}";
    host.open_document(ORDERS, orders, 1);

    let target: NavigationTarget = host
        .goto_definition(ORDERS, position_of(orders, "Billing.Invoice"))
        .expect("reference should resolve");

    assert_eq!(target.qualified_name, "Billing.Invoice");
    assert_eq!(host.uri(target.file).as_deref(), Some(BILLING));
}

#[test]
fn test_find_references_across_documents() {
    let host = host();
    let billing = "service Billing {\n  type Invoice {}\n  op charge(): Invoice\n}";
    host.open_document(BILLING, billing, 1);
    host.open_document(ORDERS, "service Orders { op place(): Billing.Invoice }", 1);

    let invoice = host.resolve_symbol("Billing.Invoice").unwrap();
    let references = host.find_references(&invoice);
    assert_eq!(references.len(), 2);

    let uris: Vec<_> = references
        .iter()
        .map(|r| host.uri(r.file).unwrap().to_string())
        .collect();
    assert!(uris.contains(&BILLING.to_string()));
    assert!(uris.contains(&ORDERS.to_string()));

    // Same answer from the declaration name under the cursor.
    let at_name = host.references_at(BILLING, position_of(billing, "Invoice"));
    assert_eq!(at_name, references);
}

#[test]
fn test_hover_and_workspace_symbols() {
    let host = host();
    let billing = "service Billing {\n  op charge(amount: int): string\n}";
    host.open_document(BILLING, billing, 1);

    let hover = host.hover(BILLING, position_of(billing, "charge")).unwrap();
    assert!(hover.contents.contains("op charge(amount: int): string"));
    assert!(hover.contents.contains("Billing.charge"));

    let symbols = host.workspace_symbols("charge");
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].container_name.as_deref(), Some("Billing"));
}

#[test]
fn test_block_comments_are_not_syntax_errors() {
    let host = host();
    let diagnostics = host.open_document(BILLING, "/* note */\nservice A { /** op **/ op foo() }", 1);

    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    assert!(host.resolve_symbol("A.foo").is_some());
}
