//! Identifiers for declarations.

use std::fmt;

use crate::base::FileId;

/// A globally unique identifier for a declaration.
///
/// Combines the owning document with a document-local index, so replacing
/// one document's entries in the symbol index never disturbs another's.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DeclId {
    pub file: FileId,
    pub local: LocalDeclId,
}

impl DeclId {
    #[inline]
    pub const fn new(file: FileId, local: LocalDeclId) -> Self {
        Self { file, local }
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({:?}:{})", self.file, self.local.0)
    }
}

/// Position of a declaration in its document's declaration list.
///
/// Assigned in source order on every build, so ids are only stable for one
/// version of a document. Never persist them across edits; re-derive from the
/// qualified name instead.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct LocalDeclId(pub u32);

impl LocalDeclId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
