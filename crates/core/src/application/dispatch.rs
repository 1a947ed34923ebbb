// Backend dispatch: file type -> print backend

use crate::domain::FileType;
use crate::port::PrintBackend;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of backends keyed by document family
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<FileType, Arc<dyn PrintBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` for `file_type` (builder style)
    pub fn with(mut self, file_type: FileType, backend: Arc<dyn PrintBackend>) -> Self {
        self.register(file_type, backend);
        self
    }

    pub fn register(&mut self, file_type: FileType, backend: Arc<dyn PrintBackend>) {
        self.backends.insert(file_type, backend);
    }

    /// Backend for `file_type`. `Unknown` never has one.
    pub fn resolve(&self, file_type: FileType) -> Option<Arc<dyn PrintBackend>> {
        if !file_type.is_supported() {
            return None;
        }
        self.backends.get(&file_type).cloned()
    }

    pub fn supports(&self, file_type: FileType) -> bool {
        self.resolve(file_type).is_some()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.backends.keys().map(|t| t.label()).collect();
        types.sort_unstable();
        f.debug_struct("BackendRegistry")
            .field("file_types", &types)
            .finish()
    }
}
