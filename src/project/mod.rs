//! Project management: loading a workspace directory on first open.

mod workspace_loader;

pub use workspace_loader::{
    LOADED_VERSION, LoadError, LoadReport, WorkspaceLoader, collect_file_paths, file_uri,
};
