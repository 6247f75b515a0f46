//! Service container for dependency injection
//!
//! Wires up settings, I/O boundaries and the document store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::DataFormController;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::{DocumentStore, InfraResult};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Definition documents, read and written through the injected filesystem
    pub documents: DocumentStore,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            documents: DocumentStore::new(fs),
        }
    }

    /// Definition file: explicit override or the configured one.
    pub fn definition_file(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.definition_file.clone())
    }

    /// Load the definition into a controller configured from settings.
    pub fn load_controller(&self, path: &Path) -> InfraResult<DataFormController> {
        let controller = self.documents.load_controller(path)?;
        Ok(controller.with_default_node_type(self.settings.default_node_type))
    }
}
