//! Dependency graph between projects.
//!
//! Edges point from dependent to dependency: if A depends on B, the edge is
//! `A -> B`. Every ordering this module returns puts dependencies first.
//!
//! ```
//! use plasmic_core::resolve::graph::ProjectGraph;
//!
//! let mut graph = ProjectGraph::new();
//! graph.add_edge("site", "design-system");
//! graph.add_edge("design-system", "icons");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["icons", "design-system", "site"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    /// Adjacency list: key depends on each value.
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project without dependencies.
    pub fn add_node(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`; both become nodes.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Direct dependencies of a project, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Kahn's algorithm; ties are broken alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyCycle` naming every project that could not
    /// be ordered.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        // Remaining unsatisfied dependencies per node
        let mut pending: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(current) = ready.pop_first() {
            order.push(current.to_string());
            for (from, deps) in &self.edges {
                if deps.contains(current)
                    && let Some(count) = pending.get_mut(from.as_str())
                {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(from.as_str());
                    }
                }
            }
        }

        if order.len() != self.edges.len() {
            let sorted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let participants = self
                .edges
                .keys()
                .filter(|id| !sorted.contains(id.as_str()))
                .cloned()
                .collect();
            return Err(Error::DependencyCycle { participants });
        }
        Ok(order)
    }

    /// Depth-first post-order from each root in turn: a project's
    /// dependencies come before it, and a project reached twice keeps its
    /// first position.
    ///
    /// The graph must be acyclic; call [`Self::topological_sort`] first.
    pub fn dependency_order<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        for root in roots {
            self.visit(root, &mut visited, &mut order);
        }
        order
    }

    fn visit(&self, id: &str, visited: &mut BTreeSet<String>, order: &mut Vec<String>) {
        if !visited.insert(id.to_string()) {
            return;
        }
        for dep in self.dependencies_of(id) {
            self.visit(dep, visited, order);
        }
        order.push(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_graph() {
        let graph = ProjectGraph::new();
        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.dependency_order(["a"]).len() == 1);
    }

    #[test]
    fn diamond_orders_leaves_first() {
        let mut graph = ProjectGraph::new();
        graph.add_edge("app", "left");
        graph.add_edge("app", "right");
        graph.add_edge("left", "base");
        graph.add_edge("right", "base");

        let order = graph.topological_sort().unwrap();
        assert_eq!(order, vec!["base", "left", "right", "app"]);
        assert_eq!(graph.dependency_order(["app"]), vec!["base", "left", "right", "app"]);
    }

    #[test]
    fn shared_dependency_keeps_first_position() {
        let mut graph = ProjectGraph::new();
        graph.add_edge("a", "shared");
        graph.add_edge("b", "shared");

        assert_eq!(graph.dependency_order(["b", "a"]), vec!["shared", "b", "a"]);
    }

    #[test]
    fn cycle_names_participants() {
        let mut graph = ProjectGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("c", "a");
        graph.add_node("d");

        match graph.topological_sort() {
            Err(Error::DependencyCycle { participants }) => {
                assert_eq!(participants, vec!["a", "b", "c"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
