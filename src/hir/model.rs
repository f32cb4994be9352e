//! The semantic model of one document.

use std::fmt;

use smol_str::SmolStr;

use super::ids::{DeclId, LocalDeclId};
use crate::base::{FileId, TextRange, TextSize};

/// Separator between segments of a qualified name.
pub const PATH_SEPARATOR: char = '.';

// ============================================================================
// DECLARATIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Service,
    Operation,
    Type,
    Field,
}

impl DeclKind {
    pub fn display(&self) -> &'static str {
        match self {
            DeclKind::Service => "service",
            DeclKind::Operation => "operation",
            DeclKind::Type => "type",
            DeclKind::Field => "field",
        }
    }

    /// Whether declarations of this kind open a scope for their members.
    pub fn is_container(&self) -> bool {
        matches!(self, DeclKind::Service | DeclKind::Type)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// A named construct introduced by source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub id: DeclId,
    /// Simple name, e.g. `foo`.
    pub name: SmolStr,
    /// Dot-separated path from the document root, e.g. `Orders.foo`.
    pub qualified_name: SmolStr,
    pub kind: DeclKind,
    /// The owning document. A back-reference, not ownership.
    pub file: FileId,
    /// Span of the whole declaration.
    pub range: TextRange,
    /// Span of the name token.
    pub name_range: TextRange,
    /// One-line signature, e.g. `op place(items: Item[]): Invoice`.
    pub detail: SmolStr,
    /// Qualified names of direct members.
    pub exports: Vec<SmolStr>,
}

impl Declaration {
    /// Qualified name of the enclosing container, `""` at the root.
    pub fn container_name(&self) -> &str {
        parent_scope(&self.qualified_name).unwrap_or("")
    }
}

// ============================================================================
// REFERENCES
// ============================================================================

/// What a reference is allowed to point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Parameter, return, alias and field types.
    Type,
    /// `extends` targets.
    Service,
    /// `calls` targets.
    Operation,
    /// `import A.B` - any declaration.
    Import,
    /// `import A.*` - a service or type whose members become visible.
    Namespace,
}

impl RefKind {
    pub fn accepts(&self, kind: DeclKind) -> bool {
        match self {
            RefKind::Type => kind == DeclKind::Type,
            RefKind::Service => kind == DeclKind::Service,
            RefKind::Operation => kind == DeclKind::Operation,
            RefKind::Import => true,
            RefKind::Namespace => kind.is_container(),
        }
    }

    pub fn expected(&self) -> &'static str {
        match self {
            RefKind::Type => "a type",
            RefKind::Service => "a service",
            RefKind::Operation => "an operation",
            RefKind::Import => "a declaration",
            RefKind::Namespace => "a service or type",
        }
    }

    pub fn is_import(&self) -> bool {
        matches!(self, RefKind::Import | RefKind::Namespace)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrokenReason {
    NotFound,
    /// Several imports make different declarations visible under this name.
    AmbiguousImport { candidates: Vec<SmolStr> },
    /// The name resolved, but to the wrong kind of declaration.
    TypeMismatch { expected: RefKind, found: DeclKind },
}

/// Where a resolved reference points. Only the symbol-table key is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub id: DeclId,
    pub qualified_name: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolved(ResolvedTarget),
    Broken(BrokenReason),
}

/// A usage site naming a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// The path as written, e.g. `Billing.charge`.
    pub path: SmolStr,
    pub kind: RefKind,
    pub file: FileId,
    pub range: TextRange,
    /// Qualified name of the enclosing container the path is looked up from.
    pub scope: SmolStr,
    pub resolution: Resolution,
}

impl Reference {
    pub fn target(&self) -> Option<&ResolvedTarget> {
        match &self.resolution {
            Resolution::Resolved(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolution == Resolution::Unresolved
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split(PATH_SEPARATOR)
    }
}

/// An `import` directive. Its path is stored as `references[reference]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: SmolStr,
    pub wildcard: bool,
    pub alias: Option<SmolStr>,
    pub reference: usize,
    pub range: TextRange,
}

impl Import {
    /// The name a specific import binds: its alias, or the path's last
    /// segment. Wildcard imports bind no single name.
    pub fn visible_name(&self) -> Option<&str> {
        if self.wildcard {
            return None;
        }
        self.alias
            .as_deref()
            .or_else(|| self.path.rsplit(PATH_SEPARATOR).next())
    }
}

// ============================================================================
// SEMANTIC MODEL
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemanticModel {
    pub file: FileId,
    /// In source order; `declarations[i].id.local == i`.
    pub declarations: Vec<Declaration>,
    pub references: Vec<Reference>,
    pub imports: Vec<Import>,
}

impl SemanticModel {
    pub fn empty(file: FileId) -> Self {
        Self {
            file,
            declarations: Vec::new(),
            references: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn declaration(&self, id: LocalDeclId) -> Option<&Declaration> {
        self.declarations.get(id.index())
    }

    /// Local lookup by qualified name; the last declaration wins.
    pub fn lookup_local(&self, qualified_name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.qualified_name == qualified_name)
    }

    /// The reference whose span contains `offset`.
    pub fn reference_at(&self, offset: TextSize) -> Option<&Reference> {
        self.references
            .iter()
            .find(|r| r.range.contains_inclusive(offset))
    }

    /// The declaration whose name token contains `offset`.
    pub fn declaration_at(&self, offset: TextSize) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.name_range.contains_inclusive(offset))
    }

    pub fn unresolved_count(&self) -> usize {
        self.references.iter().filter(|r| r.is_unresolved()).count()
    }
}

// ============================================================================
// NAME HELPERS
// ============================================================================

/// "A.B.C" -> Some("A.B"), "A" -> Some(""), "" -> None
pub fn parent_scope(qualified_name: &str) -> Option<&str> {
    if qualified_name.is_empty() {
        return None;
    }
    match qualified_name.rfind(PATH_SEPARATOR) {
        Some(idx) => Some(&qualified_name[..idx]),
        None => Some(""),
    }
}

pub fn qualify(scope: &str, name: &str) -> SmolStr {
    if scope.is_empty() {
        SmolStr::new(name)
    } else {
        smol_str::format_smolstr!("{scope}{PATH_SEPARATOR}{name}")
    }
}

/// `scope`, its parent, ... up to and including the root `""`.
pub fn scope_chain(scope: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(scope), |s| parent_scope(s))
}
