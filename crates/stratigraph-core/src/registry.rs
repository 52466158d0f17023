//! Named graphs held side by side
//!
//! A [`GraphRegistry`] is an explicit context object: callers that need to
//! locate graphs by id are handed one, and independent registries never
//! share state.

use crate::error::{Error, Result};
use crate::graph::{Graph, MergeReport};
use indexmap::IndexMap;

/// Graphs keyed by id, in registration order
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: IndexMap<String, Graph>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a graph under its own id
    pub fn register(&mut self, graph: Graph) -> Result<&mut Graph> {
        let id = graph.id().to_string();
        if self.graphs.contains_key(&id) {
            return Err(Error::GraphExists(id));
        }
        tracing::debug!("Registering graph {}", id);
        let (pos, _) = self.graphs.insert_full(id, graph);
        Ok(&mut self.graphs[pos])
    }

    pub fn get(&self, id: &str) -> Result<&Graph> {
        self.graphs
            .get(id)
            .ok_or_else(|| Error::GraphNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Graph> {
        self.graphs
            .get_mut(id)
            .ok_or_else(|| Error::GraphNotFound(id.to_string()))
    }

    /// The only registered graph; an error when zero or several are registered
    pub fn get_default(&self) -> Result<&Graph> {
        match self.graphs.len() {
            1 => Ok(&self.graphs[0]),
            count => Err(Error::NoDefaultGraph { count }),
        }
    }

    pub fn get_default_mut(&mut self) -> Result<&mut Graph> {
        match self.graphs.len() {
            1 => Ok(&mut self.graphs[0]),
            count => Err(Error::NoDefaultGraph { count }),
        }
    }

    /// Unregister a graph and hand it back
    pub fn remove(&mut self, id: &str) -> Result<Graph> {
        let graph = self
            .graphs
            .shift_remove(id)
            .ok_or_else(|| Error::GraphNotFound(id.to_string()))?;
        tracing::debug!("Removed graph {}", id);
        Ok(graph)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.graphs.contains_key(id)
    }

    /// Registered ids in registration order
    pub fn list_ids(&self) -> Vec<&str> {
        self.graphs.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Merge the graph `source_id` into `target_id`.
    /// The source stays registered and unchanged.
    pub fn merge(&mut self, target_id: &str, source_id: &str) -> Result<MergeReport> {
        let source = self.get(source_id)?.clone();
        let target = self.get_mut(target_id)?;
        Ok(target.merge_from(&source))
    }
}
