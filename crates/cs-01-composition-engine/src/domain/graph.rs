//! Dependency graph store
//!
//! Arena of Compositions keyed by id. Each node owns its ordered forward edge
//! list; the reverse index (`of` -> dependents) is maintained incrementally on
//! every edge change so reverse lookups never scan the arena.

use super::entities::{Composition, CompositionId, Dependency};
use super::errors::GraphError;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct CompositionGraph {
    nodes: HashMap<CompositionId, Composition>,
    reverse: HashMap<CompositionId, HashSet<CompositionId>>,
}

impl CompositionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stored nodes, rebuilding the reverse index
    pub fn from_nodes(nodes: impl IntoIterator<Item = Composition>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &CompositionId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &CompositionId) -> Option<&Composition> {
        self.nodes.get(id)
    }

    pub fn get_node(&self, id: &CompositionId) -> Result<&Composition, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    /// Mutable access to node fields. Edges must go through `set_edges`.
    pub(crate) fn get_node_mut(&mut self, id: &CompositionId) -> Option<&mut Composition> {
        self.nodes.get_mut(id)
    }

    /// Insert or replace a node, keeping the reverse index in step.
    /// Returns the previous value, if any.
    pub fn insert_node(&mut self, node: Composition) -> Option<Composition> {
        let id = node.id.clone();
        if let Some(old) = self.nodes.get(&id) {
            let old_targets: Vec<CompositionId> = old.dependency_ids().cloned().collect();
            self.unlink(&id, old_targets.iter());
        }
        self.link(&id, node.dependency_ids());
        self.nodes.insert(id, node)
    }

    /// Replace a node's dependency list and its reverse entries together
    pub fn set_edges(
        &mut self,
        id: &CompositionId,
        edges: Vec<Dependency>,
    ) -> Result<(), GraphError> {
        let old = match self.nodes.get(id) {
            Some(node) => node.dependency_ids().cloned().collect::<Vec<_>>(),
            None => return Err(GraphError::NotFound(id.clone())),
        };
        self.unlink(id, old.iter());
        self.link(id, edges.iter().map(|d| &d.of));
        if let Some(node) = self.nodes.get_mut(id) {
            node.dependencies = edges;
        }
        Ok(())
    }

    /// Ids currently depending on `id`, sorted
    pub fn reverse_dependents(&self, id: &CompositionId) -> BTreeSet<CompositionId> {
        self.reverse
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_dependents(&self, id: &CompositionId) -> bool {
        self.reverse.get(id).is_some_and(|set| !set.is_empty())
    }

    /// Remove a node nobody depends on
    pub fn remove_node(&mut self, id: &CompositionId) -> Result<Composition, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NotFound(id.clone()));
        }
        let dependents = self.reverse_dependents(id);
        if !dependents.is_empty() {
            return Err(GraphError::ReferencedByOthers {
                id: id.clone(),
                dependents: dependents.into_iter().collect(),
            });
        }
        self.evict(id)
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    /// Remove a node regardless of dependents. Used to undo an insert.
    pub(crate) fn evict(&mut self, id: &CompositionId) -> Option<Composition> {
        let node = self.nodes.remove(id)?;
        self.unlink(id, node.dependency_ids());
        Some(node)
    }

    /// All ids, sorted
    pub fn ids(&self) -> Vec<CompositionId> {
        let mut ids: Vec<_> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Composition> {
        self.nodes.values()
    }

    /// Every node, sorted by id
    pub fn snapshot(&self) -> Vec<Composition> {
        let mut nodes: Vec<_> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Reverse index as sorted pairs, for consistency checks
    pub(crate) fn reverse_index(&self) -> &HashMap<CompositionId, HashSet<CompositionId>> {
        &self.reverse
    }

    fn link<'a>(&mut self, from: &CompositionId, targets: impl Iterator<Item = &'a CompositionId>) {
        for of in targets {
            self.reverse
                .entry(of.clone())
                .or_default()
                .insert(from.clone());
        }
    }

    fn unlink<'a>(
        &mut self,
        from: &CompositionId,
        targets: impl Iterator<Item = &'a CompositionId>,
    ) {
        for of in targets {
            if let Some(set) = self.reverse.get_mut(of) {
                set.remove(from);
                if set.is_empty() {
                    self.reverse.remove(of);
                }
            }
        }
    }
}
