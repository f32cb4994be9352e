//! Folding ranges: collapsible code regions.
//!
//! Taken from the syntax tree: service, type and parameter bodies that span
//! several lines, and multi-line block comments.

use super::store::Document;
use crate::parser::SyntaxKind;

/// A folding range with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingRange {
    /// Start line (0-indexed)
    pub start_line: u32,
    /// Start column (0-indexed)
    pub start_col: u32,
    /// End line (0-indexed)
    pub end_line: u32,
    /// End column (0-indexed)
    pub end_col: u32,
    /// Whether this is a comment region
    pub is_comment: bool,
}

/// Get folding ranges for a document, sorted by start line.
pub fn folding_ranges(document: &Document) -> Vec<FoldingRange> {
    let root = document.parse.syntax();
    let mut ranges: Vec<FoldingRange> = root
        .descendants_with_tokens()
        .filter_map(|element| {
            let is_comment = match element.kind() {
                SyntaxKind::SERVICE_BODY | SyntaxKind::TYPE_BODY | SyntaxKind::PARAM_LIST => false,
                SyntaxKind::BLOCK_COMMENT => true,
                _ => return None,
            };
            let (start, end) = document.line_index.range(element.text_range());
            (end.line > start.line).then_some(FoldingRange {
                start_line: start.line,
                start_col: start.col,
                end_line: end.line,
                end_col: end.col,
                is_comment,
            })
        })
        .collect();

    ranges.sort_by_key(|r| (r.start_line, r.start_col));
    ranges
}
