//! Hover information.

use smol_str::SmolStr;

use super::goto::declaration_at;
use super::store::Document;
use crate::base::{TextRange, TextSize};
use crate::hir::{BrokenReason, DeclKind, Resolution, SymbolIndex};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// Markdown: the signature in a code block, then kind and path.
    pub contents: String,
    pub qualified_name: Option<SmolStr>,
    pub kind: Option<DeclKind>,
    /// The span the hover applies to.
    pub range: TextRange,
}

pub fn hover(document: &Document, index: &SymbolIndex, offset: TextSize) -> Option<HoverResult> {
    let reference = document.model.reference_at(offset);

    if let Some(decl) = declaration_at(document, index, offset) {
        let range = reference.map_or(decl.name_range, |r| r.range);
        return Some(HoverResult {
            contents: format!(
                "```\n{}\n```\n{} `{}`",
                decl.detail, decl.kind, decl.qualified_name
            ),
            qualified_name: Some(decl.qualified_name.clone()),
            kind: Some(decl.kind),
            range,
        });
    }

    // Explain why a broken reference goes nowhere.
    let reference = reference?;
    let why = match &reference.resolution {
        Resolution::Broken(BrokenReason::NotFound) => "not found".to_string(),
        Resolution::Broken(BrokenReason::AmbiguousImport { candidates }) => {
            format!("ambiguous: {}", candidates.join(", "))
        }
        Resolution::Broken(BrokenReason::TypeMismatch { expected, found }) => {
            format!("{found} where {} is expected", expected.expected())
        }
        Resolution::Unresolved | Resolution::Resolved(_) => return None,
    };
    Some(HoverResult {
        contents: format!("`{}`: {why}", reference.path),
        qualified_name: None,
        kind: None,
        range: reference.range,
    })
}
