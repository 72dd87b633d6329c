//! In-process registry of backend instances
//!
//! Implements [`BackendLookup`] over a list of named instances. Handles are
//! registered once (usually from configuration) and shared by every path
//! that resolves to them.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::backend::{BackendHandle, BackendLookup};

/// A registered backend instance
#[derive(Clone)]
pub struct RegisteredInstance {
    pub id: String,
    pub selector: String,
    pub handle: BackendHandle,
}

impl std::fmt::Debug for RegisteredInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredInstance")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Registry of live backend instances
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: RwLock<Vec<RegisteredInstance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance, replacing any previous instance with the same id
    pub fn register(
        &self,
        id: impl Into<String>,
        selector: impl Into<String>,
        handle: BackendHandle,
    ) {
        let instance = RegisteredInstance {
            id: id.into(),
            selector: selector.into(),
            handle,
        };
        let mut instances = self.write();
        instances.retain(|i| i.id != instance.id);
        instances.push(instance);
    }

    /// Remove an instance, returning whether it was present
    pub fn unregister(&self, id: &str) -> bool {
        let mut instances = self.write();
        let before = instances.len();
        instances.retain(|i| i.id != id);
        instances.len() != before
    }

    /// Ids of registered instances, in registration order
    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|i| i.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<RegisteredInstance>> {
        self.instances.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RegisteredInstance>> {
        self.instances.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BackendLookup for InstanceRegistry {
    async fn find_backend(
        &self,
        instance_id: Option<&str>,
        selector: &str,
    ) -> Option<BackendHandle> {
        let instances = self.read();
        let found = match instance_id {
            Some(id) => instances.iter().find(|i| i.id == id),
            None => instances.iter().find(|i| i.selector == selector),
        };
        found.map(|i| i.handle.clone())
    }
}
