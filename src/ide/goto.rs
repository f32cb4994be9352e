//! Go-to-definition.

use smol_str::SmolStr;

use super::store::Document;
use crate::base::{FileId, TextRange, TextSize};
use crate::hir::{DeclKind, Declaration, SymbolIndex};

/// Where a symbol is declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationTarget {
    pub file: FileId,
    pub name: SmolStr,
    pub qualified_name: SmolStr,
    pub kind: DeclKind,
    /// The whole declaration.
    pub full_range: TextRange,
    /// Just the name; where the cursor should land.
    pub focus_range: TextRange,
}

impl From<&Declaration> for NavigationTarget {
    fn from(decl: &Declaration) -> Self {
        Self {
            file: decl.file,
            name: decl.name.clone(),
            qualified_name: decl.qualified_name.clone(),
            kind: decl.kind,
            full_range: decl.range,
            focus_range: decl.name_range,
        }
    }
}

/// The declaration named at `offset`: the target of a resolved reference,
/// or the declaration whose name is under the cursor.
pub fn declaration_at<'a>(
    document: &'a Document,
    index: &'a SymbolIndex,
    offset: TextSize,
) -> Option<&'a Declaration> {
    if let Some(reference) = document.model.reference_at(offset) {
        let target = reference.target()?;
        return index
            .get(target.id)
            .or_else(|| index.lookup_qualified(&target.qualified_name));
    }
    document.model.declaration_at(offset)
}

pub fn goto_definition(
    document: &Document,
    index: &SymbolIndex,
    offset: TextSize,
) -> Option<NavigationTarget> {
    declaration_at(document, index, offset).map(NavigationTarget::from)
}
