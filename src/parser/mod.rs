//! Lexer and parser for the service DSL.
//!
//! [`parse`] is total: any input yields a lossless tree plus the syntax
//! errors found on the way. Malformed regions are wrapped in `ERROR` nodes.
//!
//! ```text
//! import Billing.*;
//!
//! service Orders extends Base {
//!     type Item { sku: string; qty: int }
//!     op place(items: Item[]): Invoice calls Billing.charge;
//! }
//! ```

mod grammar;
mod lexer;
mod syntax_kind;

use std::fmt;

use rowan::GreenNode;

use crate::base::TextRange;

pub use lexer::{Token, tokenize};
pub use syntax_kind::{ServiceLanguage, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};

/// A syntax error found while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?}", self.message, self.range)
    }
}

/// Result of parsing one document.
///
/// Holds the green tree, which is cheap to clone and can cross threads;
/// call [`Parse::syntax`] for a navigable root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parse {
    green: GreenNode,
    errors: Vec<SyntaxError>,
}

impl Parse {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a document. Deterministic and never fails.
pub fn parse(text: &str) -> Parse {
    let tokens = tokenize(text);
    let mut parser = grammar::Parser::new(text, &tokens);
    grammar::source_file(&mut parser);
    let (green, errors) = parser.finish();
    Parse { green, errors }
}

// ============================================================================
// TREE ACCESSORS
// ============================================================================

/// First child node of the given kind.
pub fn child(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxNode> {
    node.children().find(|c| c.kind() == kind)
}

/// All child nodes of the given kind, in source order.
pub fn children(node: &SyntaxNode, kind: SyntaxKind) -> impl Iterator<Item = SyntaxNode> {
    node.children().filter(move |c| c.kind() == kind)
}

/// First direct child token of the given kind.
pub fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

/// Whether the node carries a parse-error marker as a direct child.
pub fn has_error_marker(node: &SyntaxNode) -> bool {
    node.children().any(|c| c.kind() == SyntaxKind::ERROR)
}

/// The `IDENT` token inside a `NAME` child.
pub fn name_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    child(node, SyntaxKind::NAME).and_then(|n| token(&n, SyntaxKind::IDENT))
}

/// Dotted text of a `PATH` node, without trivia.
pub fn path_text(path: &SyntaxNode) -> String {
    path.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::DOT))
        .map(|t| t.text().to_string())
        .collect()
}
