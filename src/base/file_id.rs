//! Document identifiers.

use std::fmt;

/// Handle for a document known to the store.
///
/// URIs are mapped to `FileId`s by [`crate::hir::FileSet`]; everything below
/// the store (declarations, references, the symbol index) only sees the id.
/// Ids are never reused while the process runs, so a stale id held by a
/// closed document cannot alias a newly opened one.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_display() {
        assert_eq!(FileId::new(7).to_string(), "doc#7");
        assert_eq!(format!("{:?}", FileId::new(7)), "FileId(7)");
    }

    #[test]
    fn test_file_id_ordering() {
        let mut ids = vec![FileId::new(3), FileId::new(1), FileId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![FileId::new(1), FileId::new(2), FileId::new(3)]);
    }
}
