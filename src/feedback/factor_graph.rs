//! Factor-graph cascade removal: when a parameter-pattern's underlying
//! factor is replaced mid-iteration, every transitive dependent must be
//! removed and re-added with updated edges, rather than left dangling.
//! Uses `petgraph` for the dependency graph.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::HashMap;

/// A dependency graph over named factors: an edge `a -> b` means `b`
/// depends on `a`.
///
/// Uses `StableDiGraph` rather than `DiGraph`: plain `DiGraph::remove_node`
/// swap-removes the last node into the vacated slot, silently aliasing
/// `index_of` entries for unrelated factors across repeated removals.
/// `StableDiGraph` leaves a tombstone instead, so every `NodeIndex` we
/// cache in `index_of` stays valid for the graph's lifetime.
#[derive(Debug, Default)]
pub struct FactorGraph {
    graph: StableDiGraph<String, ()>,
    index_of: HashMap<String, NodeIndex>,
}

impl FactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factor(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(idx) = self.index_of.get(&name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.index_of.insert(name, idx);
        idx
    }

    pub fn add_dependency(&mut self, depends_on: &str, dependent: &str) {
        let from = self.add_factor(depends_on);
        let to = self.add_factor(dependent);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of.contains_key(name)
    }

    /// Remove `factor` and every transitive dependent of it, returning the
    /// names of the removed dependents (not including `factor` itself).
    /// `index_of` stays valid for every surviving node since removal never
    /// aliases another factor's index (see the `StableDiGraph` note above).
    pub fn remove_cascading(&mut self, factor: &str) -> Vec<String> {
        let Some(&idx) = self.index_of.get(factor) else { return Vec::new() };

        let mut dependents = Vec::new();
        let mut dfs = Dfs::new(&self.graph, idx);
        while let Some(node) = dfs.next(&self.graph) {
            if node != idx {
                dependents.push(self.graph[node].clone());
            }
        }

        for dependent in &dependents {
            if let Some(&dependent_idx) = self.index_of.get(dependent) {
                self.graph.remove_node(dependent_idx);
                self.index_of.remove(dependent);
            }
        }
        self.graph.remove_node(idx);
        self.index_of.remove(factor);

        dependents
    }

    /// Replace `old_factor` with `new_factor`: remove every transitive
    /// dependent of `old_factor`, remove `old_factor` itself, add
    /// `new_factor`, then re-add each removed dependent with an edge from
    /// `new_factor`.
    pub fn replace_factor(&mut self, old_factor: &str, new_factor: &str) -> Vec<String> {
        if !self.index_of.contains_key(old_factor) {
            return Vec::new();
        }
        let dependents = self.remove_cascading(old_factor);

        let new_idx = self.add_factor(new_factor);
        for dependent in &dependents {
            let dependent_idx = self.add_factor(dependent);
            self.graph.update_edge(new_idx, dependent_idx, ());
        }

        dependents
    }

    /// All factors that transitively depend on `factor`, outward direction.
    pub fn dependents_of(&self, factor: &str) -> Vec<String> {
        let Some(&idx) = self.index_of.get(factor) else { return Vec::new() };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect()
    }
}
