use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

use crate::hir::Diagnostic;
use crate::ide::{AnalysisHost, DiagnosticsEvent, HostConfig, PreparedDocument};

/// Version given to documents read from disk.
pub const LOADED_VERSION: i32 = 0;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("directory not found: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to walk workspace: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("cannot express {} as a file URI", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a workspace load did.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// URIs of the documents now open, sorted.
    pub loaded: Vec<Arc<str>>,
    /// URIs already open in the editor; their editor text was kept.
    pub skipped: Vec<Arc<str>>,
    /// Files that could not be read; the rest of the load went ahead.
    pub failed: Vec<(PathBuf, LoadError)>,
    /// Diagnostics across all loaded documents.
    pub diagnostic_count: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.diagnostic_count == 0
    }
}

/// Loads workspace files into an [`AnalysisHost`].
pub struct WorkspaceLoader;

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every file under `path` with one of the host's configured
    /// extensions.
    ///
    /// Files are read and analyzed in parallel, then committed together so
    /// cross-file references resolve regardless of load order.
    pub fn load_directory_into_host<P: Into<PathBuf>>(
        &self,
        path: P,
        host: &AnalysisHost,
    ) -> Result<LoadReport, LoadError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(LoadError::NotADirectory(path));
        }
        let path = std::path::absolute(&path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;

        let mut report = LoadReport::default();
        let paths = collect_file_paths(&path, host.config(), &mut report.failed)?;

        let read: Vec<_> = paths
            .par_iter()
            .map(|path| prepare(path, host))
            .collect();

        let mut prepared = Vec::with_capacity(read.len());
        for result in read {
            match result {
                Ok(document) => prepared.push(document),
                Err(LoadError::Read { path, source }) => {
                    tracing::warn!(path = %path.display(), error = %source, "skipping unreadable file");
                    report.failed.push((path.clone(), LoadError::Read { path, source }));
                }
                Err(LoadError::InvalidPath(path)) => {
                    tracing::warn!(path = %path.display(), "skipping file without a URI");
                    report.failed.push((path.clone(), LoadError::InvalidPath(path)));
                }
                Err(other) => return Err(other),
            }
        }

        let mut candidates: Vec<Arc<str>> = prepared.iter().map(|p| p.uri.clone()).collect();
        let events = host.store().open_bulk(prepared);
        report.diagnostic_count = events.iter().map(|e| e.diagnostics.len()).sum();
        report.loaded = events.into_iter().map(|DiagnosticsEvent { uri, .. }| uri).collect();
        report.loaded.sort();
        candidates.retain(|uri| report.loaded.binary_search(uri).is_err());
        report.skipped = candidates;

        tracing::debug!(
            dir = %path.display(),
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            diagnostics = report.diagnostic_count,
            "loaded workspace"
        );
        Ok(report)
    }

    /// Load a single file, whatever its extension. An already open document
    /// is left as the editor has it.
    pub fn load_file_into_host<P: Into<PathBuf>>(
        &self,
        path: P,
        host: &AnalysisHost,
    ) -> Result<Vec<Diagnostic>, LoadError> {
        let path = path.into();
        let path = std::path::absolute(&path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;
        let document = prepare(&path, host)?;
        let uri = document.uri.clone();
        host.store().open_bulk(vec![document]);
        Ok(host.diagnostics(&uri))
    }
}

impl Default for WorkspaceLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// The `file://` URI for an absolute path, percent-encoded the way editors
/// send it.
pub fn file_uri(path: &Path) -> Result<String, LoadError> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| LoadError::InvalidPath(path.to_path_buf()))
}

/// Files under `dir` with an accepted extension, sorted. Entries that
/// cannot be walked are recorded in `failed`.
pub fn collect_file_paths(
    dir: &Path,
    config: &HostConfig,
    failed: &mut Vec<(PathBuf, LoadError)>,
) -> Result<Vec<PathBuf>, LoadError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself failing is fatal.
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                let path = err.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                failed.push((path, err.into()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let accepted = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.accepts_extension(e));
        if accepted {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn prepare(path: &Path, host: &AnalysisHost) -> Result<PreparedDocument, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let uri = file_uri(path)?;
    let file = host.store().allocate(&uri);
    let analysis = host.analyze(file, &text);
    Ok(PreparedDocument {
        uri: uri.into(),
        file,
        version: LOADED_VERSION,
        text: text.into(),
        analysis,
    })
}
