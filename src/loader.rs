//! Module loading
//!
//! Cross-module type lookup is an injected capability: the resolver asks a
//! [`ModuleLoader`] for declarations it cannot find in the current module
//! set. Lookups are memoized inside one resolver only, so the same loader
//! can serve independent compilation runs without leaking state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::model::Module;

/// Loads the declarations of a module outside the current module set.
pub trait ModuleLoader {
    /// Load a module by name. `Ok(None)` means the module does not exist;
    /// `Err` means it exists but could not be read. The resolver treats both
    /// conservatively.
    fn load(&self, module: &str) -> anyhow::Result<Option<Module>>;
}

// =============================================================================
// Null Loader
// =============================================================================

/// Loader for closed-world analysis: every foreign module is missing.
pub struct NullLoader;

impl ModuleLoader for NullLoader {
    fn load(&self, _module: &str) -> anyhow::Result<Option<Module>> {
        Ok(None)
    }
}

// =============================================================================
// In-Memory Loader
// =============================================================================

/// Loader backed by a fixed map of modules. Used by tests and by callers
/// that collected all foreign declarations up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    modules: HashMap<String, Module>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }
}

impl ModuleLoader for InMemoryLoader {
    fn load(&self, module: &str) -> anyhow::Result<Option<Module>> {
        Ok(self.modules.get(module).cloned())
    }
}

// =============================================================================
// Directory Loader
// =============================================================================

/// Loader reading `<name>.module.json` declaration files from a directory
/// tree. The JSON layout is the serde form of [`Module`].
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn find_file(&self, module: &str) -> Option<PathBuf> {
        let file_name = format!("{}.module.json", module);
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.path().is_file()
                    && e.path().file_name().map(|n| n == file_name.as_str()).unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
    }

    fn read_module(path: &Path) -> anyhow::Result<Module> {
        let content = fs::read_to_string(path)?;
        let module: Module = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?;
        Ok(module)
    }
}

impl ModuleLoader for DirectoryLoader {
    fn load(&self, module: &str) -> anyhow::Result<Option<Module>> {
        let Some(path) = self.find_file(module) else {
            tracing::debug!(module, root = %self.root.display(), "module file not found");
            return Ok(None);
        };
        let loaded = Self::read_module(&path)?;
        Ok(Some(loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TypeDeclaration, TypeRef};

    #[test]
    fn test_in_memory_loader_roundtrip() {
        let mut loader = InMemoryLoader::new();
        loader.insert(Module::new("net").with_types(vec![TypeDeclaration::Alias {
            name: "Port".into(),
            target: TypeRef::plain("uint32"),
        }]));

        let loaded = loader.load("net").unwrap().unwrap();
        assert!(loaded.get_type("Port").is_some());
        assert!(loader.load("missing").unwrap().is_none());
    }

    #[test]
    fn test_directory_loader_reads_module_files() {
        let dir = tempfile::tempdir().unwrap();
        let module = Module::new("net").with_types(vec![TypeDeclaration::Alias {
            name: "Port".into(),
            target: TypeRef::plain("uint32"),
        }]);
        let path = dir.path().join("net.module.json");
        fs::write(&path, serde_json::to_string(&module).unwrap()).unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let loaded = loader.load("net").unwrap().unwrap();
        assert_eq!(loaded.name, "net");
        assert!(loaded.get_type("Port").is_some());
        assert!(loader.load("other").unwrap().is_none());
    }

    #[test]
    fn test_directory_loader_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.module.json"), "{not json").unwrap();

        let loader = DirectoryLoader::new(dir.path());
        assert!(loader.load("bad").is_err());
    }
}
