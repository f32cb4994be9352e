//! Hard failures of the semantic pipeline.

use thiserror::Error;

use crate::base::TextRange;
use crate::parser::SyntaxKind;

/// The syntax tree has a shape the model builder cannot interpret.
///
/// The parser marks every recovery point with an `ERROR` node, so a missing
/// child without such a marker means the tree itself is malformed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InternalFault {
    #[error("expected a SOURCE_FILE root, found {found:?}")]
    UnexpectedRoot { found: SyntaxKind },

    #[error("{parent:?} node is missing its {missing:?} child")]
    MissingChild {
        parent: SyntaxKind,
        missing: SyntaxKind,
        range: TextRange,
    },

    #[error("unexpected {found:?} node inside {parent:?}")]
    UnexpectedNode {
        parent: SyntaxKind,
        found: SyntaxKind,
        range: TextRange,
    },
}

impl InternalFault {
    /// Where the fault was detected; the root has no useful span.
    pub fn range(&self) -> Option<TextRange> {
        match self {
            InternalFault::UnexpectedRoot { .. } => None,
            InternalFault::MissingChild { range, .. }
            | InternalFault::UnexpectedNode { range, .. } => Some(*range),
        }
    }
}
