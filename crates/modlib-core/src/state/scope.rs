//! The caller's active scope: member bindings produced by imports.

use indexmap::IndexMap;

use crate::domain::module::{MemberKind, ModuleKey};

/// One member binding in the active scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeBinding {
    /// Member kind.
    pub kind: MemberKind,
    /// The member's original (unprefixed) name in its module.
    pub member: String,
    /// Key of the module the binding came from.
    pub module: ModuleKey,
}

/// Name-to-binding map for the caller's active scope.
///
/// Mutated only under the owning state lock, so a no-clobber import reads
/// existing names and writes new bindings atomically with respect to other
/// importers.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: IndexMap<String, ScopeBinding>,
}

impl Scope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a name is already bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bind a name unless it is already taken.
    ///
    /// Returns `false` when the name was already present (the no-clobber
    /// skip); the existing binding is left untouched.
    pub fn bind_if_absent(&mut self, name: impl Into<String>, binding: ScopeBinding) -> bool {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return false;
        }
        self.bindings.insert(name, binding);
        true
    }

    /// Bind a name, overwriting any existing binding.
    pub fn bind(&mut self, name: impl Into<String>, binding: ScopeBinding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Look up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ScopeBinding> {
        self.bindings.get(name)
    }

    /// Drop every binding that originated from the given module.
    pub fn remove_module_members(&mut self, module: &ModuleKey) {
        self.bindings.retain(|_, binding| &binding.module != module);
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the scope is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
