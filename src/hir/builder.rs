//! Syntax tree → semantic model.
//!
//! One walk over the tree collects declarations (with qualified names) and
//! the references that still need resolving. Nothing here looks at other
//! documents; unknown names are the resolver's business.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::error::InternalFault;
use super::ids::{DeclId, LocalDeclId};
use super::model::{
    DeclKind, Declaration, Import, RefKind, Reference, Resolution, SemanticModel, qualify,
};
use crate::base::{FileId, TextRange};
use crate::parser::{
    SyntaxKind, SyntaxNode, child, children, has_error_marker, name_token, path_text, token,
};

/// Toggles for the optional semantic checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Warn about service and type names that do not start uppercase.
    pub naming_lints: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { naming_lints: true }
    }
}

/// Build the semantic model of one document with default options.
pub fn build(
    file: FileId,
    root: &SyntaxNode,
) -> Result<(SemanticModel, Vec<Diagnostic>), InternalFault> {
    ModelBuilder::new(file).build(root)
}

pub struct ModelBuilder {
    file: FileId,
    options: BuildOptions,
    model: SemanticModel,
    diagnostics: DiagnosticCollector,
}

impl ModelBuilder {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            options: BuildOptions::default(),
            model: SemanticModel::empty(file),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(
        mut self,
        root: &SyntaxNode,
    ) -> Result<(SemanticModel, Vec<Diagnostic>), InternalFault> {
        if root.kind() != SyntaxKind::SOURCE_FILE {
            return Err(InternalFault::UnexpectedRoot { found: root.kind() });
        }

        for item in root.children() {
            match item.kind() {
                SyntaxKind::IMPORT => self.import(&item)?,
                SyntaxKind::SERVICE => self.service(&item, "")?,
                SyntaxKind::TYPE_DECL => self.type_decl(&item, "")?,
                // Skipped input, including misplaced top-level operations.
                SyntaxKind::ERROR => {}
                found => {
                    return Err(InternalFault::UnexpectedNode {
                        parent: SyntaxKind::SOURCE_FILE,
                        found,
                        range: item.text_range(),
                    });
                }
            }
        }

        self.check_duplicates();
        Ok((self.model, self.diagnostics.finish()))
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn import(&mut self, node: &SyntaxNode) -> Result<(), InternalFault> {
        let Some(path) = self.required_child(node, SyntaxKind::PATH)? else {
            return Ok(());
        };
        let wildcard = token(node, SyntaxKind::STAR).is_some();
        let alias = child(node, SyntaxKind::ALIAS)
            .and_then(|a| token(&a, SyntaxKind::IDENT))
            .map(|t| SmolStr::new(t.text()));

        let kind = if wildcard {
            RefKind::Namespace
        } else {
            RefKind::Import
        };
        let reference = self.reference(&path, kind, "");
        let path_text = self.model.references[reference].path.clone();
        self.model.imports.push(Import {
            path: path_text,
            wildcard,
            alias,
            reference,
            range: node.text_range(),
        });
        Ok(())
    }

    fn service(&mut self, node: &SyntaxNode, scope: &str) -> Result<(), InternalFault> {
        let Some((name, name_range)) = self.required_name(node)? else {
            return Ok(());
        };
        let qualified_name = qualify(scope, &name);

        let extends = child(node, SyntaxKind::EXTENDS_CLAUSE);
        let mut detail = format!("service {name}");
        if let Some(path) = extends.as_ref().and_then(|e| child(e, SyntaxKind::PATH)) {
            detail.push_str(" extends ");
            detail.push_str(&path_text(&path));
            self.reference(&path, RefKind::Service, scope);
        }

        let index = self.declare(
            DeclKind::Service,
            &name,
            qualified_name.clone(),
            node.text_range(),
            name_range,
            detail,
        );

        let mut operations = 0;
        if let Some(body) = self.required_child(node, SyntaxKind::SERVICE_BODY)? {
            for member in body.children() {
                match member.kind() {
                    SyntaxKind::OPERATION => {
                        if self.operation(&member, &qualified_name)? {
                            operations += 1;
                        }
                    }
                    SyntaxKind::TYPE_DECL => self.type_decl(&member, &qualified_name)?,
                    SyntaxKind::ERROR => {}
                    found => {
                        return Err(InternalFault::UnexpectedNode {
                            parent: SyntaxKind::SERVICE_BODY,
                            found,
                            range: member.text_range(),
                        });
                    }
                }
            }
        }
        self.collect_exports(index);

        if self.options.naming_lints && !starts_uppercase(&name) {
            self.diagnostics
                .naming_convention(name_range, "service", &name);
        }
        if operations == 0 {
            self.diagnostics.empty_service(name_range, &name);
        }
        Ok(())
    }

    /// Returns whether an operation declaration was recorded.
    fn operation(&mut self, node: &SyntaxNode, scope: &str) -> Result<bool, InternalFault> {
        let Some((name, name_range)) = self.required_name(node)? else {
            return Ok(false);
        };
        let qualified_name = qualify(scope, &name);

        let mut params = Vec::new();
        if let Some(list) = self.required_child(node, SyntaxKind::PARAM_LIST)? {
            let mut seen: FxHashMap<SmolStr, TextRange> = FxHashMap::default();
            for param in children(&list, SyntaxKind::PARAM) {
                let Some((param_name, param_range)) = self.required_name(&param)? else {
                    continue;
                };
                let ty = match child(&param, SyntaxKind::TYPE_REF) {
                    Some(ty) => {
                        self.type_ref(&ty, scope)?;
                        type_ref_text(&ty)
                    }
                    None => self.missing_or_fault(&param, SyntaxKind::TYPE_REF)?,
                };
                if seen.insert(param_name.clone(), param_range).is_some() {
                    self.diagnostics
                        .duplicate_parameter(param_range, &param_name, &qualified_name);
                }
                params.push(format!("{param_name}: {ty}"));
            }
        }

        let mut detail = format!("op {name}({})", params.join(", "));
        if let Some(ret) = child(node, SyntaxKind::RETURN_TYPE) {
            if let Some(ty) = self.required_child(&ret, SyntaxKind::TYPE_REF)? {
                self.type_ref(&ty, scope)?;
                detail.push_str(": ");
                detail.push_str(&type_ref_text(&ty));
            }
        }
        if let Some(calls) = child(node, SyntaxKind::CALLS_CLAUSE) {
            for path in children(&calls, SyntaxKind::PATH) {
                self.reference(&path, RefKind::Operation, scope);
            }
        }

        self.declare(
            DeclKind::Operation,
            &name,
            qualified_name,
            node.text_range(),
            name_range,
            detail,
        );
        Ok(true)
    }

    fn type_decl(&mut self, node: &SyntaxNode, scope: &str) -> Result<(), InternalFault> {
        let Some((name, name_range)) = self.required_name(node)? else {
            return Ok(());
        };
        let qualified_name = qualify(scope, &name);

        let mut detail = format!("type {name}");
        let alias = child(node, SyntaxKind::TYPE_REF);
        if let Some(ty) = &alias {
            self.type_ref(ty, scope)?;
            detail.push_str(" = ");
            detail.push_str(&type_ref_text(ty));
        }

        let index = self.declare(
            DeclKind::Type,
            &name,
            qualified_name.clone(),
            node.text_range(),
            name_range,
            detail,
        );

        if alias.is_none() {
            if let Some(body) = self.required_child(node, SyntaxKind::TYPE_BODY)? {
                for field in children(&body, SyntaxKind::FIELD) {
                    self.field(&field, &qualified_name)?;
                }
            }
        }
        self.collect_exports(index);

        if self.options.naming_lints && !starts_uppercase(&name) {
            self.diagnostics.naming_convention(name_range, "type", &name);
        }
        Ok(())
    }

    fn field(&mut self, node: &SyntaxNode, scope: &str) -> Result<(), InternalFault> {
        let Some((name, name_range)) = self.required_name(node)? else {
            return Ok(());
        };
        let ty = match child(node, SyntaxKind::TYPE_REF) {
            Some(ty) => {
                self.type_ref(&ty, scope)?;
                type_ref_text(&ty)
            }
            None => self.missing_or_fault(node, SyntaxKind::TYPE_REF)?,
        };
        self.declare(
            DeclKind::Field,
            &name,
            qualify(scope, &name),
            node.text_range(),
            name_range,
            format!("{name}: {ty}"),
        );
        Ok(())
    }

    /// Primitives are keywords, not references.
    fn type_ref(&mut self, node: &SyntaxNode, scope: &str) -> Result<(), InternalFault> {
        if token(node, SyntaxKind::PRIMITIVE_KW).is_some() {
            return Ok(());
        }
        if let Some(path) = self.required_child(node, SyntaxKind::PATH)? {
            self.reference(&path, RefKind::Type, scope);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    fn declare(
        &mut self,
        kind: DeclKind,
        name: &str,
        qualified_name: SmolStr,
        range: TextRange,
        name_range: TextRange,
        detail: String,
    ) -> usize {
        let index = self.model.declarations.len();
        self.model.declarations.push(Declaration {
            id: DeclId::new(self.file, LocalDeclId::new(index as u32)),
            name: SmolStr::new(name),
            qualified_name,
            kind,
            file: self.file,
            range,
            name_range,
            detail: SmolStr::from(detail),
            exports: Vec::new(),
        });
        index
    }

    /// Direct members are the declarations after `index`, inside its range,
    /// whose container is it. A later duplicate keeps its own members.
    fn collect_exports(&mut self, index: usize) {
        let (head, members) = self.model.declarations.split_at_mut(index + 1);
        let container = &mut head[index];
        let name = container.qualified_name.clone();
        let range = container.range;
        container.exports = members
            .iter()
            .filter(|d| range.contains_range(d.range) && d.container_name() == name)
            .map(|d| d.qualified_name.clone())
            .collect();
    }

    fn reference(&mut self, path: &SyntaxNode, kind: RefKind, scope: &str) -> usize {
        let index = self.model.references.len();
        self.model.references.push(Reference {
            path: SmolStr::from(path_text(path)),
            kind,
            file: self.file,
            range: path.text_range(),
            scope: SmolStr::new(scope),
            resolution: Resolution::Unresolved,
        });
        index
    }

    fn check_duplicates(&mut self) {
        let mut last_by_name: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, decl) in self.model.declarations.iter().enumerate() {
            last_by_name.insert(decl.qualified_name.as_str(), i);
        }
        for (i, decl) in self.model.declarations.iter().enumerate() {
            let winner = last_by_name[decl.qualified_name.as_str()];
            if winner != i {
                let later = &self.model.declarations[winner];
                self.diagnostics.duplicate_definition(
                    decl.name_range,
                    &decl.qualified_name,
                    later.file,
                    later.name_range,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Shape checks
    // ------------------------------------------------------------------

    /// A missing child is fine when the parser left an error marker.
    fn required_child(
        &self,
        node: &SyntaxNode,
        kind: SyntaxKind,
    ) -> Result<Option<SyntaxNode>, InternalFault> {
        match child(node, kind) {
            Some(found) => Ok(Some(found)),
            None if has_error_marker(node) => Ok(None),
            None => Err(InternalFault::MissingChild {
                parent: node.kind(),
                missing: kind,
                range: node.text_range(),
            }),
        }
    }

    fn required_name(
        &self,
        node: &SyntaxNode,
    ) -> Result<Option<(SmolStr, TextRange)>, InternalFault> {
        match name_token(node) {
            Some(ident) => Ok(Some((SmolStr::new(ident.text()), ident.text_range()))),
            None => self.required_child(node, SyntaxKind::NAME).map(|_| None),
        }
    }

    fn missing_or_fault(
        &self,
        node: &SyntaxNode,
        kind: SyntaxKind,
    ) -> Result<String, InternalFault> {
        self.required_child(node, kind).map(|_| "?".to_string())
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Source text of a type reference without trivia, e.g. `Billing.Item[]`.
fn type_ref_text(node: &SyntaxNode) -> String {
    node.descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
        .map(|t| t.text().to_string())
        .collect()
}
