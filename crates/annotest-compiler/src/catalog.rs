/// Step-definition catalog
///
/// The resolver only sees the [`StepCatalog`] capability. [`StepManifest`] is
/// the implementation built from step files on disk (see `step_file`).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Hook namespace of a step-definition module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
}

impl HookKind {
    /// Reserved annotation key, also the module namespace name
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Before => "before",
            HookKind::After => "after",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a resolved invocation calls into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// `before[key]` / `after[key]`
    Hook { kind: HookKind, key: String },
    /// `steps[text]`
    Step { text: String },
}

/// Lookup of step texts and hook keys
pub trait StepCatalog {
    fn resolve_step(&self, text: &str) -> Option<Callee>;
    fn resolve_hook(&self, kind: HookKind, key: &str) -> Option<Callee>;
}

/// Keys exported by one step-definition module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepModule {
    /// File the keys were read from
    pub path: PathBuf,
    /// Script the generated module imports; differs from `path` for JSON manifests
    pub import: PathBuf,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub steps: Vec<String>,
}

impl StepModule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            import: path.clone(),
            path,
            ..Self::default()
        }
    }

    pub fn import(mut self, script: impl Into<PathBuf>) -> Self {
        self.import = script.into();
        self
    }

    pub fn before(mut self, key: impl Into<String>) -> Self {
        self.before.push(key.into());
        self
    }

    pub fn after(mut self, key: impl Into<String>) -> Self {
        self.after.push(key.into());
        self
    }

    pub fn step(mut self, text: impl Into<String>) -> Self {
        self.steps.push(text.into());
        self
    }
}

/// Union of step modules, in load order
#[derive(Debug, Clone, Default)]
pub struct StepManifest {
    modules: Vec<StepModule>,
    steps: HashSet<String>,
    hooks: HashSet<(HookKind, String)>,
}

impl StepManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: StepModule) {
        self.steps.extend(module.steps.iter().cloned());
        self.hooks
            .extend(module.before.iter().map(|key| (HookKind::Before, key.clone())));
        self.hooks
            .extend(module.after.iter().map(|key| (HookKind::After, key.clone())));
        self.modules.push(module);
    }

    pub fn with_module(mut self, module: StepModule) -> Self {
        self.add_module(module);
        self
    }

    /// Modules in load order
    pub fn modules(&self) -> &[StepModule] {
        &self.modules
    }

    /// Scripts the generated module imports, in load order, without repeats
    pub fn imports(&self) -> Vec<&Path> {
        let mut imports: Vec<&Path> = Vec::new();
        for module in &self.modules {
            if !imports.contains(&module.import.as_path()) {
                imports.push(&module.import);
            }
        }
        imports
    }
}

impl StepCatalog for StepManifest {
    fn resolve_step(&self, text: &str) -> Option<Callee> {
        self.steps.contains(text).then(|| Callee::Step {
            text: text.to_string(),
        })
    }

    fn resolve_hook(&self, kind: HookKind, key: &str) -> Option<Callee> {
        self.hooks
            .contains(&(kind, key.to_string()))
            .then(|| Callee::Hook {
                kind,
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> StepManifest {
        StepManifest::new()
            .with_module(
                StepModule::new("a.js")
                    .before("all")
                    .step("When I test"),
            )
            .with_module(StepModule::new("b.js").after("justOne").step("When I test"))
    }

    #[test]
    fn test_exact_step_lookup() {
        let m = manifest();
        assert_eq!(
            m.resolve_step("When I test"),
            Some(Callee::Step { text: "When I test".into() })
        );
        assert_eq!(m.resolve_step("when I test"), None);
        assert_eq!(m.resolve_step("When I test "), None);
    }

    #[test]
    fn test_hooks_are_namespaced() {
        let m = manifest();
        assert!(m.resolve_hook(HookKind::Before, "all").is_some());
        assert!(m.resolve_hook(HookKind::After, "all").is_none());
        assert!(m.resolve_hook(HookKind::After, "justOne").is_some());
    }

    #[test]
    fn test_imports_follow_load_order_without_repeats() {
        let m = manifest()
            .with_module(StepModule::new("extra.json").import("b.js").step("Then I log out"));
        assert_eq!(m.imports(), vec![Path::new("a.js"), Path::new("b.js")]);
        assert_eq!(m.modules().len(), 3);
        assert!(m.resolve_step("Then I log out").is_some());
    }
}
