//! Directory-backed pipe store

use crate::core::{PipeError, PipeResult, RawPipe};
use crate::store::PipeStore;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Pipe store reading `<root>/<pipe_id>.{json,yaml,yml}`
#[derive(Debug, Clone)]
pub struct DirectoryPipeStore {
    root: PathBuf,
}

impl DirectoryPipeStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create store with default path
    pub fn with_default_path() -> Self {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(data_dir.join("pipegraph").join("pipes"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PipeStore for DirectoryPipeStore {
    fn lookup(&self, pipe_id: &str) -> PipeResult<Option<RawPipe>> {
        if pipe_id.contains(['/', '\\']) || pipe_id.starts_with('.') {
            return Err(PipeError::definition(format!("invalid pipe id '{}'", pipe_id)));
        }

        for extension in EXTENSIONS {
            let path = self.root.join(format!("{}.{}", pipe_id, extension));
            if path.is_file() {
                debug!("Loading pipe {} from {}", pipe_id, path.display());
                return RawPipe::from_file(&path).map(|pipe| Some(pipe.with_id(pipe_id)));
            }
        }

        Ok(None)
    }
}
