use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::types::ids::IngestionId;

use super::batch::Ingestion;

/// Process-lifetime map of accepted ingestions.
///
/// Entries are never evicted. Readers get a shared handle and observe batch
/// status changes made by the drain loop without copying.
#[derive(Default)]
pub struct IngestionRegistry {
    entries: DashMap<IngestionId, Arc<Ingestion>>,
}

impl fmt::Debug for IngestionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl IngestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ingestion: Arc<Ingestion>) {
        self.entries.insert(ingestion.id(), ingestion);
    }

    pub fn get(&self, id: &IngestionId) -> Option<Arc<Ingestion>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::batch::{CreationClock, Priority};

    #[test]
    fn lookup_returns_shared_handle() {
        let registry = IngestionRegistry::new();
        let ingestion =
            Arc::new(Ingestion::split(&[1, 2, 3, 4], Priority::Low, &CreationClock::new()).unwrap());
        registry.insert(Arc::clone(&ingestion));

        let found = registry.get(&ingestion.id()).expect("registered");
        assert!(Arc::ptr_eq(&found, &ingestion));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&IngestionId::new()).is_none());
    }
}
