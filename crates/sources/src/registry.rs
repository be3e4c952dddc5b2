//! Session factories by ingress type

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::session::SessionFactory;

/// Maps an ingress `type` tag to the factory that opens its sessions
#[derive(Clone, Default)]
pub struct IngressRegistry {
    factories: HashMap<&'static str, Arc<dyn SessionFactory>>,
}

impl IngressRegistry {
    /// Registry with the built-in factories compiled into this build
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "kafka")]
        registry.register(Arc::new(crate::kafka::KafkaSessionFactory));
        registry
    }

    /// Registry with no factories
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace the factory for its type tag
    pub fn register(&mut self, factory: Arc<dyn SessionFactory>) -> &mut Self {
        self.factories.insert(factory.kind(), factory);
        self
    }

    /// Factory for a type tag
    pub fn get(&self, kind: &str) -> Option<Arc<dyn SessionFactory>> {
        self.factories.get(kind).cloned()
    }

    /// Whether a type tag has a factory
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type tags, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for IngressRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngressRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MEMORY_KIND, MemoryBroker};

    #[test]
    fn test_empty_registry() {
        let registry = IngressRegistry::empty();
        assert!(!registry.contains("kafka"));
        assert!(registry.get("memory").is_none());
        assert!(registry.kinds().is_empty());
    }

    #[test]
    fn test_register_memory() {
        let broker = MemoryBroker::new();
        let mut registry = IngressRegistry::new();
        registry.register(broker.factory());

        assert!(registry.contains(MEMORY_KIND));
        assert_eq!(registry.get(MEMORY_KIND).unwrap().kind(), MEMORY_KIND);
    }

    #[cfg(feature = "kafka")]
    #[test]
    fn test_kafka_builtin() {
        assert_eq!(IngressRegistry::new().kinds(), vec!["kafka"]);
    }
}
