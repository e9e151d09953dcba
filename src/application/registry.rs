//! ToolRegistry - catalog of tool descriptors.
//!
//! Insertion-ordered, unique by name. Registration normally happens at
//! startup; reads are concurrent.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::domain::tool::{CapabilitySet, ToolDescriptor};

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool '{name}' is already registered")]
    DuplicateTool { name: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },
}

#[derive(Default)]
struct Catalog {
    descriptors: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl Catalog {
    fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Registry of tool descriptors.
#[derive(Default)]
pub struct ToolRegistry {
    catalog: RwLock<Catalog>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// `DuplicateTool` if the name (or an alias with that name) exists.
    pub fn register(&self, descriptor: ToolDescriptor) -> Result<Arc<ToolDescriptor>, RegistryError> {
        let mut catalog = self.write();
        let name = descriptor.name().to_string();
        if catalog.index.contains_key(&name) || catalog.aliases.contains_key(&name) {
            return Err(RegistryError::DuplicateTool { name });
        }
        let descriptor = Arc::new(descriptor);
        let position = catalog.descriptors.len();
        catalog.descriptors.push(descriptor.clone());
        catalog.index.insert(name, position);
        Ok(descriptor)
    }

    /// Maps `alias` onto a registered tool.
    ///
    /// # Errors
    ///
    /// `UnknownTool` if the target is not registered, `InvalidAlias` if the
    /// alias would shadow a tool name or is already taken.
    pub fn register_alias(&self, alias: impl Into<String>, target: &str) -> Result<(), RegistryError> {
        let alias = alias.into();
        let mut catalog = self.write();
        let target = catalog.canonical(target).to_string();
        if !catalog.index.contains_key(&target) {
            return Err(RegistryError::UnknownTool { name: target });
        }
        if catalog.index.contains_key(&alias) {
            return Err(RegistryError::InvalidAlias {
                alias,
                reason: "shadows a registered tool".to_string(),
            });
        }
        if catalog.aliases.contains_key(&alias) {
            return Err(RegistryError::InvalidAlias {
                alias,
                reason: "already defined".to_string(),
            });
        }
        catalog.aliases.insert(alias, target);
        Ok(())
    }

    /// Looks a tool up by name or alias.
    ///
    /// # Errors
    ///
    /// `UnknownTool` if neither matches.
    pub fn get(&self, name: &str) -> Result<Arc<ToolDescriptor>, RegistryError> {
        let catalog = self.read();
        let canonical = catalog.canonical(name);
        catalog
            .index
            .get(canonical)
            .map(|&i| catalog.descriptors[i].clone())
            .ok_or_else(|| RegistryError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Descriptors whose capabilities intersect `filter`, in insertion order.
    /// An empty filter returns every descriptor.
    pub fn list(&self, filter: &CapabilitySet) -> Vec<Arc<ToolDescriptor>> {
        self.read()
            .descriptors
            .iter()
            .filter(|d| filter.is_empty() || d.capabilities().intersects(filter))
            .cloned()
            .collect()
    }

    /// Every descriptor, in insertion order.
    pub fn all(&self) -> Vec<Arc<ToolDescriptor>> {
        self.list(&CapabilitySet::new())
    }

    /// Alias table (alias -> tool name).
    pub fn aliases(&self) -> HashMap<String, String> {
        self.read().aliases.clone()
    }

    pub fn len(&self) -> usize {
        self.read().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
