//! JSON persistence of data-source definitions

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::DataFormController;
use crate::domain::DataFormDocument;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Reads and writes `{ "nodes": [...], "bindings": [...] }` documents.
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
}

impl DocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<DataFormDocument> {
        if !self.fs.exists(path) {
            return Err(InfraError::NotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let document: DataFormDocument = serde_json::from_str(&content)
            .map_err(|e| InfraError::json(path.display().to_string(), e))?;
        debug!(
            "loaded {} root nodes, {} bindings",
            document.nodes.len(),
            document.bindings.len()
        );
        Ok(document)
    }

    /// Write via a sibling temp file and rename, so a failed write keeps the old document.
    #[instrument(level = "debug", skip(self, document))]
    pub fn save(&self, path: &Path, document: &DataFormDocument) -> InfraResult<()> {
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| InfraError::json(path.display().to_string(), e))?;
        self.fs
            .ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;

        let tmp = path.with_extension("json.tmp");
        self.fs
            .write(&tmp, &format!("{content}\n"))
            .map_err(|e| InfraError::io(format!("write {}", tmp.display()), e))?;
        self.fs
            .rename(&tmp, path)
            .map_err(|e| InfraError::io(format!("replace {}", path.display()), e))?;
        Ok(())
    }

    /// Write an empty document; refuses to overwrite an existing one.
    pub fn create(&self, path: &Path) -> InfraResult<()> {
        if self.fs.exists(path) {
            return Err(InfraError::AlreadyExists(path.to_path_buf()));
        }
        self.save(path, &DataFormDocument::default())
    }

    pub fn load_controller(&self, path: &Path) -> InfraResult<DataFormController> {
        let document = self.load(path)?;
        Ok(DataFormController::from_document(&document)?)
    }

    pub fn save_controller(&self, path: &Path, controller: &DataFormController) -> InfraResult<()> {
        self.save(path, &controller.to_document())
    }
}
