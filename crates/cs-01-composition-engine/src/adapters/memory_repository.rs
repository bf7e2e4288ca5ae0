//! In-memory repository
//!
//! Default backend and test double. Holds a copy of every committed node.

use crate::domain::entities::{Composition, CompositionId};
use crate::domain::errors::RepositoryError;
use crate::ports::outbound::{ChangeSet, CompositionRepository};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    data: RwLock<BTreeMap<CompositionId, Composition>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with `nodes`
    pub fn with_nodes(nodes: impl IntoIterator<Item = Composition>) -> Self {
        let data = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self {
            data: RwLock::new(data),
        }
    }

    pub fn get(&self, id: &CompositionId) -> Option<Composition> {
        self.data.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl CompositionRepository for InMemoryRepository {
    fn load_all(&self) -> Result<Vec<Composition>, RepositoryError> {
        Ok(self.data.read().values().cloned().collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        let mut data = self.data.write();
        for id in changes.deletes {
            data.remove(&id);
        }
        for node in changes.upserts {
            data.insert(node.id.clone(), node);
        }
        Ok(())
    }
}
