//! Module registry.
//!
//! A process-wide mapping from import path to parsed module unit, owned for
//! the duration of one compilation. Units are keyed by their resolved path
//! for import de-duplication; identity conflicts are detected by the
//! declared module name, which must be unique across the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rye_ast::ModuleId;
use rye_parser::ParsedModule;

/// A native method exposed to the analyzer: name plus declared arity.
#[derive(Debug, Clone)]
pub struct NativeMethod {
    pub name: String,
    pub nargs: u32,
}

/// A host-provided module definition consumed by `add_module`.
#[derive(Debug, Clone)]
pub struct ModuleDefine {
    pub name: String,
    pub methods: Vec<NativeMethod>,
}

impl ModuleDefine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, nargs: u32) -> Self {
        self.methods.push(NativeMethod {
            name: name.into(),
            nargs,
        });
        self
    }
}

/// Owns every parsed unit of one compilation.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    units: Vec<ParsedModule>,
    by_path: HashMap<PathBuf, ModuleId>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit, finalizing its node ids against the shared counter.
    /// The caller is responsible for the name-identity check.
    pub fn insert(&mut self, mut unit: ParsedModule, next_node_id: &mut u32) -> ModuleId {
        let id = ModuleId(self.units.len() as u32);
        unit.finalize(id, next_node_id);
        self.by_path.insert(unit.path.clone(), id);
        self.units.push(unit);
        id
    }

    /// Insert a synthetic unit for a native module definition.
    pub fn insert_native(&mut self, name: &str) -> ModuleId {
        let path = PathBuf::from(format!("<native:{}>", name));
        let mut unit = ParsedModule::parse("", &path);
        unit.name = name.to_string();
        let id = ModuleId(self.units.len() as u32);
        self.by_path.insert(path, id);
        self.units.push(unit);
        id
    }

    pub fn get(&self, id: ModuleId) -> &ParsedModule {
        &self.units[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut ParsedModule {
        &mut self.units[id.0 as usize]
    }

    /// Find a unit by its declared module name.
    pub fn find_by_name(&self, name: &str) -> Option<ModuleId> {
        self.units
            .iter()
            .position(|u| u.name == name)
            .map(|idx| ModuleId(idx as u32))
    }

    /// True if an import path has already been registered.
    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The declared name of `id`, for mangling.
    pub fn module_name(&self, id: ModuleId) -> &str {
        &self.units[id.0 as usize].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_dedup_and_names_resolve() {
        let mut registry = ModuleRegistry::new();
        let mut ids = 0u32;
        let unit = ParsedModule::parse("module alpha;\nlet a = 1;", "/src/alpha.rye");
        registry.insert(unit, &mut ids);

        assert!(registry.contains_path(Path::new("/src/alpha.rye")));
        assert!(!registry.contains_path(Path::new("/src/beta.rye")));
        assert_eq!(registry.find_by_name("alpha"), Some(ModuleId(0)));
        assert_eq!(registry.find_by_name("beta"), None);
    }

    #[test]
    fn native_units_are_addressable_by_name() {
        let mut registry = ModuleRegistry::new();
        let id = registry.insert_native("io");
        assert_eq!(registry.find_by_name("io"), Some(id));
        assert_eq!(registry.module_name(id), "io");
    }
}
