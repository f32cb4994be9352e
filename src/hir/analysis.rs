//! The lock-free half of the pipeline: parse and build one document.

use super::builder::{BuildOptions, ModelBuilder};
use super::diagnostics::Diagnostic;
use super::error::InternalFault;
use super::model::SemanticModel;
use crate::base::{FileId, LineIndex};
use crate::parser::{Parse, parse};

/// Everything derived from one text snapshot before resolution.
///
/// Plain data, safe to compute on any thread.
#[derive(Clone, Debug)]
pub struct FileAnalysis {
    pub parse: Parse,
    pub line_index: LineIndex,
    /// Unresolved model; the store resolves it at commit time.
    pub model: SemanticModel,
    pub syntax_diagnostics: Vec<Diagnostic>,
    pub semantic_diagnostics: Vec<Diagnostic>,
}

/// Parse `text` and build its semantic model.
pub fn analyze(
    file: FileId,
    text: &str,
    options: &BuildOptions,
) -> Result<FileAnalysis, InternalFault> {
    let parse = parse(text);
    let syntax_diagnostics = parse.errors().iter().map(Diagnostic::from).collect();
    let (model, semantic_diagnostics) = ModelBuilder::new(file)
        .with_options(options.clone())
        .build(&parse.syntax())?;

    Ok(FileAnalysis {
        line_index: LineIndex::new(text),
        parse,
        model,
        syntax_diagnostics,
        semantic_diagnostics,
    })
}
