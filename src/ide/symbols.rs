//! Document and workspace symbols.

use smol_str::SmolStr;

use super::store::Document;
use crate::base::{FileId, TextRange};
use crate::hir::{DeclKind, Declaration, SymbolIndex};

/// A symbol for outline and workspace-symbol views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub qualified_name: SmolStr,
    pub kind: DeclKind,
    pub file: FileId,
    pub range: TextRange,
    pub selection_range: TextRange,
    /// Qualified name of the enclosing service or type.
    pub container_name: Option<SmolStr>,
    pub detail: SmolStr,
}

impl From<&Declaration> for SymbolInfo {
    fn from(decl: &Declaration) -> Self {
        let container = decl.container_name();
        Self {
            name: decl.name.clone(),
            qualified_name: decl.qualified_name.clone(),
            kind: decl.kind,
            file: decl.file,
            range: decl.range,
            selection_range: decl.name_range,
            container_name: (!container.is_empty()).then(|| SmolStr::new(container)),
            detail: decl.detail.clone(),
        }
    }
}

/// All declarations of one document, in source order.
pub fn document_symbols(document: &Document) -> Vec<SymbolInfo> {
    document
        .model
        .declarations
        .iter()
        .map(SymbolInfo::from)
        .collect()
}

/// Declarations across all open documents whose qualified name contains
/// `query`, ignoring case.
pub fn workspace_symbols(index: &SymbolIndex, query: &str) -> Vec<SymbolInfo> {
    index
        .search(query)
        .into_iter()
        .map(SymbolInfo::from)
        .collect()
}
