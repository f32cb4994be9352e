//! Name resolution: binding references to their declarations.
//!
//! Resolution runs per document against two tables: the document's own
//! declarations and the global [`SymbolIndex`] covering every open document.
//!
//! # Lookup order
//!
//! 1. Import paths are resolved first, as fully qualified names.
//! 2. Every other path walks its scope chain from the innermost container
//!    out to the root. At each level the document's own declarations shadow
//!    the index.
//! 3. Failing that, the path is tried through the document's imports.
//!    Several imports leading to different declarations is an ambiguity.
//! 4. Whatever was found must be of the kind the reference asks for.
//!
//! The index keeps every declaration of every open document, duplicates
//! included. When several share a qualified name, the one from the most
//! recently indexed document wins, then the later one in that document.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::ids::DeclId;
use super::model::{
    BrokenReason, Declaration, Import, PATH_SEPARATOR, Reference, Resolution, ResolvedTarget,
    SemanticModel, qualify, scope_chain,
};
use crate::base::FileId;

// ============================================================================
// SYMBOL INDEX
// ============================================================================

#[derive(Clone, Debug)]
struct IndexEntry {
    decl: Declaration,
    /// Bumped every time the owning document is (re)indexed.
    generation: u64,
}

/// Process-wide table of declarations from all open documents.
///
/// Entries are keyed by [`DeclId`], so every declaration appears exactly
/// once. A document's entries are only ever swapped as a whole, see
/// [`SymbolIndex::replace_file`].
#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    entries: FxHashMap<DeclId, IndexEntry>,
    by_qualified_name: FxHashMap<SmolStr, Vec<DeclId>>,
    by_file: FxHashMap<FileId, Vec<DeclId>>,
    next_generation: u64,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all declarations of `file` with `declarations`.
    ///
    /// Returns the declarations that were removed.
    pub fn replace_file(&mut self, file: FileId, declarations: &[Declaration]) -> Vec<Declaration> {
        let old = self.remove_file(file);

        let generation = self.next_generation;
        self.next_generation += 1;

        let mut ids = Vec::with_capacity(declarations.len());
        for decl in declarations {
            debug_assert_eq!(decl.file, file);
            self.by_qualified_name
                .entry(decl.qualified_name.clone())
                .or_default()
                .push(decl.id);
            self.entries.insert(
                decl.id,
                IndexEntry {
                    decl: decl.clone(),
                    generation,
                },
            );
            ids.push(decl.id);
        }
        if !ids.is_empty() {
            self.by_file.insert(file, ids);
        }
        old
    }

    /// Remove all declarations of `file`, returning them in source order.
    pub fn remove_file(&mut self, file: FileId) -> Vec<Declaration> {
        let Some(ids) = self.by_file.remove(&file) else {
            return Vec::new();
        };

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(entry) = self.entries.remove(&id) else {
                continue;
            };
            let name = &entry.decl.qualified_name;
            if let Some(list) = self.by_qualified_name.get_mut(name) {
                list.retain(|&other| other != id);
                if list.is_empty() {
                    self.by_qualified_name.remove(name);
                }
            }
            removed.push(entry.decl);
        }
        removed
    }

    /// The winning declaration for a qualified name.
    pub fn lookup_qualified(&self, qualified_name: &str) -> Option<&Declaration> {
        self.by_qualified_name
            .get(qualified_name)?
            .iter()
            .filter_map(|id| self.entries.get(id))
            .max_by_key(|entry| (entry.generation, entry.decl.id.local))
            .map(|entry| &entry.decl)
    }

    /// Every declaration with this qualified name, winner first.
    pub fn lookup_all(&self, qualified_name: &str) -> Vec<&Declaration> {
        let mut found: Vec<&IndexEntry> = self
            .by_qualified_name
            .get(qualified_name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entries.get(id))
            .collect();
        found.sort_by_key(|entry| std::cmp::Reverse((entry.generation, entry.decl.id.local)));
        found.into_iter().map(|entry| &entry.decl).collect()
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.entries.get(&id).map(|entry| &entry.decl)
    }

    /// Declarations of one document, in source order.
    pub fn declarations_in_file(&self, file: FileId) -> Vec<&Declaration> {
        self.by_file
            .get(&file)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }

    pub fn all_declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.values().map(|entry| &entry.decl)
    }

    /// Case-insensitive substring search over simple and qualified names.
    ///
    /// Sorted by qualified name, then document. An empty query matches all.
    pub fn search(&self, query: &str) -> Vec<&Declaration> {
        let query = query.to_lowercase();
        let mut found: Vec<&Declaration> = self
            .all_declarations()
            .filter(|d| query.is_empty() || d.qualified_name.to_lowercase().contains(&query))
            .collect();
        found.sort_by(|a, b| {
            a.qualified_name
                .cmp(&b.qualified_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_qualified_name.clear();
        self.by_file.clear();
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Result of looking up one path.
#[derive(Clone, Debug)]
enum Lookup<'a> {
    Found(&'a Declaration),
    Ambiguous(Vec<&'a Declaration>),
    NotFound,
}

/// Resolves the references of one document.
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self { index }
    }

    /// Resolve every reference of `model` in place.
    ///
    /// Returns one diagnostic per reference that ends up broken.
    pub fn resolve(&self, model: &mut SemanticModel) -> Vec<Diagnostic> {
        let mut diagnostics = DiagnosticCollector::new();

        let mut resolutions: Vec<Resolution> = vec![Resolution::Unresolved; model.references.len()];

        // Imports first; the other references are looked up through them.
        for (i, reference) in model.references.iter().enumerate() {
            if reference.kind.is_import() {
                let lookup = match self.qualified(model, &reference.path) {
                    Some(decl) => Lookup::Found(decl),
                    None => Lookup::NotFound,
                };
                resolutions[i] = self.finish(reference, lookup, &mut diagnostics);
            }
        }

        let imports: Vec<(&Import, ResolvedTarget)> = model
            .imports
            .iter()
            .filter_map(|import| match &resolutions[import.reference] {
                Resolution::Resolved(target) => Some((import, target.clone())),
                _ => None,
            })
            .collect();

        for (i, reference) in model.references.iter().enumerate() {
            if reference.kind.is_import() {
                continue;
            }
            let lookup = match self.in_scope(model, reference) {
                Some(decl) => Lookup::Found(decl),
                None => self.through_imports(model, &imports, &reference.path),
            };
            resolutions[i] = self.finish(reference, lookup, &mut diagnostics);
        }

        for (reference, resolution) in model.references.iter_mut().zip(resolutions) {
            reference.resolution = resolution;
        }
        diagnostics.finish()
    }

    /// Document-local declarations shadow the index.
    fn qualified<'m>(&self, model: &'m SemanticModel, qualified_name: &str) -> Option<&'m Declaration>
    where
        'a: 'm,
    {
        model
            .lookup_local(qualified_name)
            .or_else(|| self.index.lookup_qualified(qualified_name))
    }

    fn in_scope<'m>(&self, model: &'m SemanticModel, reference: &Reference) -> Option<&'m Declaration>
    where
        'a: 'm,
    {
        scope_chain(&reference.scope)
            .find_map(|scope| self.qualified(model, &qualify(scope, &reference.path)))
    }

    fn through_imports<'m>(
        &self,
        model: &'m SemanticModel,
        imports: &[(&Import, ResolvedTarget)],
        path: &str,
    ) -> Lookup<'m>
    where
        'a: 'm,
    {
        let (first, rest) = match path.split_once(PATH_SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };

        let mut candidates: Vec<&Declaration> = Vec::new();
        for (import, target) in imports {
            let candidate = if import.wildcard {
                qualify(&target.qualified_name, path)
            } else if import.visible_name() == Some(first) {
                match rest {
                    Some(rest) => qualify(&target.qualified_name, rest),
                    None => target.qualified_name.clone(),
                }
            } else {
                continue;
            };
            if let Some(decl) = self.qualified(model, &candidate) {
                if !candidates.iter().any(|c| c.id == decl.id) {
                    candidates.push(decl);
                }
            }
        }

        match candidates.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(candidates[0]),
            _ => Lookup::Ambiguous(candidates),
        }
    }

    /// Apply the kind check and report broken references.
    fn finish(
        &self,
        reference: &Reference,
        lookup: Lookup<'_>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Resolution {
        match lookup {
            Lookup::Found(decl) if reference.kind.accepts(decl.kind) => {
                Resolution::Resolved(ResolvedTarget {
                    id: decl.id,
                    qualified_name: decl.qualified_name.clone(),
                })
            }
            Lookup::Found(decl) => {
                diagnostics.type_mismatch(
                    reference.range,
                    &reference.path,
                    reference.kind.expected(),
                    &format!("{} '{}'", decl.kind, decl.qualified_name),
                );
                Resolution::Broken(BrokenReason::TypeMismatch {
                    expected: reference.kind,
                    found: decl.kind,
                })
            }
            Lookup::Ambiguous(decls) => {
                let names: Vec<&str> = decls.iter().map(|d| d.qualified_name.as_str()).collect();
                diagnostics.ambiguous_import(reference.range, &reference.path, &names);
                Resolution::Broken(BrokenReason::AmbiguousImport {
                    candidates: decls.iter().map(|d| d.qualified_name.clone()).collect(),
                })
            }
            Lookup::NotFound => {
                diagnostics.undefined_reference(reference.range, &reference.path);
                Resolution::Broken(BrokenReason::NotFound)
            }
        }
    }
}

/// Resolve every reference of `model` against its own declarations and
/// the index.
pub fn resolve(model: &mut SemanticModel, index: &SymbolIndex) -> Vec<Diagnostic> {
    Resolver::new(index).resolve(model)
}

// ============================================================================
// DEPENDENTS
// ============================================================================

/// Every segment of every qualified name, e.g. `A.foo` gives `A` and `foo`.
pub fn name_segments<'d>(
    declarations: impl IntoIterator<Item = &'d Declaration>,
) -> FxHashSet<SmolStr> {
    declarations
        .into_iter()
        .flat_map(|d| d.qualified_name.split(PATH_SEPARATOR))
        .map(SmolStr::new)
        .collect()
}

/// Whether `model` may resolve differently after the `changed` documents
/// were re-indexed.
///
/// True if any reference currently targets one of them, or mentions one of
/// `segments` (the name segments of their old and new declarations).
pub fn depends_on(model: &SemanticModel, changed: &[FileId], segments: &FxHashSet<SmolStr>) -> bool {
    if changed.contains(&model.file) {
        return false;
    }
    model.references.iter().any(|reference| {
        reference
            .target()
            .is_some_and(|t| changed.contains(&t.id.file))
            || reference.segments().any(|s| segments.contains(s))
    })
}
