//! Find references.

use super::goto::declaration_at;
use super::store::Document;
use crate::base::TextSize;
use crate::hir::{Declaration, SymbolIndex};

/// The declaration whose references a cursor position asks for.
///
/// The store gathers the references themselves, since they live in every
/// open document.
pub fn reference_target(
    document: &Document,
    index: &SymbolIndex,
    offset: TextSize,
) -> Option<Declaration> {
    declaration_at(document, index, offset).cloned()
}
